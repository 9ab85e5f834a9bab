use camino::{Utf8Path, Utf8PathBuf};
use casework_core::{CaseError, CaseSelector, FixtureNamespace};
use casework_metadata::{
    ConfigurationFile, ConfigurationFileError, Options, OptionsError, OptionsOverrides, Settings,
};

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error(transparent)]
    ConfigurationFile(#[from] ConfigurationFileError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Case(#[from] CaseError),
}

/// The resolved configuration of a directory of tests.
#[derive(Debug, Clone)]
pub struct Project {
    root: Utf8PathBuf,
    config_path: Option<Utf8PathBuf>,
    settings: Settings,
}

impl Project {
    /// Loads the configuration that applies to `cwd`, with environment overrides applied.
    pub fn discover(cwd: &Utf8Path) -> Result<Self, ProjectError> {
        let overrides = OptionsOverrides::from_env()?;
        Self::discover_with(cwd, &overrides)
    }

    pub fn discover_with(
        cwd: &Utf8Path,
        overrides: &OptionsOverrides,
    ) -> Result<Self, ProjectError> {
        let (config_path, options) = match ConfigurationFile::discover(cwd)? {
            Some(file) => (Some(file.path().to_path_buf()), file.into_options()),
            None => (None, Options::default()),
        };
        let settings = options.to_settings_with(overrides)?;

        let root = config_path
            .as_deref()
            .and_then(Utf8Path::parent)
            .unwrap_or(cwd)
            .to_path_buf();
        tracing::debug!("Project root is `{root}`");

        Ok(Self {
            root,
            config_path,
            settings,
        })
    }

    pub fn with_settings(root: impl Into<Utf8PathBuf>, settings: Settings) -> Self {
        Self {
            root: root.into(),
            config_path: None,
            settings,
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config_path.as_deref()
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// An empty namespace honouring the configured collision policy and id styles.
    pub fn namespace(&self) -> FixtureNamespace {
        FixtureNamespace::from_settings(&self.settings)
    }

    /// A case selector with the configured prefixes and filters.
    pub fn case_selector(&self) -> Result<CaseSelector, ProjectError> {
        Ok(CaseSelector::from_settings(self.settings.cases())?)
    }
}
