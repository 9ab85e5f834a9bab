use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::options::{Options, OptionsError};
use crate::CASEWORK_CONFIG_FILE_NAME;

/// A `casework.toml` file with the options it contains.
#[derive(Debug)]
pub struct ConfigurationFile {
    path: Utf8PathBuf,
    options: Options,
}

impl ConfigurationFile {
    pub fn from_path(path: Utf8PathBuf) -> Result<Self, ConfigurationFileError> {
        let content = std::fs::read_to_string(&path).map_err(|source| {
            ConfigurationFileError::FileReadError {
                source,
                path: path.clone(),
            }
        })?;

        match Options::from_toml_str(&content) {
            Ok(options) => Ok(Self { path, options }),
            Err(error) => Err(ConfigurationFileError::InvalidCaseworkToml {
                source: Box::new(error),
                path,
            }),
        }
    }

    /// Finds the configuration that applies to `start`.
    ///
    /// `CASEWORK_CONFIG_FILE` wins when set. Otherwise `start` and its ancestors are searched
    /// for a `casework.toml`, and the closest one is loaded.
    pub fn discover(start: &Utf8Path) -> Result<Option<Self>, ConfigurationFileError> {
        if let Some(path) = casework_static::config_file_override() {
            tracing::debug!("Using configuration file from `CASEWORK_CONFIG_FILE`: `{path}`");
            return Self::from_path(Utf8PathBuf::from(path)).map(Some);
        }

        for directory in start.ancestors() {
            let candidate = directory.join(CASEWORK_CONFIG_FILE_NAME);
            tracing::trace!("Searching for a configuration at `{candidate}`");
            if candidate.is_file() {
                tracing::debug!("Found configuration file at `{candidate}`");
                return Self::from_path(candidate).map(Some);
            }
        }

        tracing::debug!("No `{CASEWORK_CONFIG_FILE_NAME}` found above `{start}`");
        Ok(None)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub const fn options(&self) -> &Options {
        &self.options
    }

    pub fn into_options(self) -> Options {
        self.options
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationFileError {
    #[error("{path} is not a valid `casework.toml`: {source}")]
    InvalidCaseworkToml {
        source: Box<OptionsError>,
        path: Utf8PathBuf,
    },
    #[error("Failed to read `{path}`: {source}")]
    FileReadError {
        #[source]
        source: std::io::Error,
        path: Utf8PathBuf,
    },
}
