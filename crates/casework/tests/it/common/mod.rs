use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use casework::{CallSpec, FixtureDef, OptionsOverrides, ParamValue, Project};
use tempfile::TempDir;

/// A temporary project directory, optionally holding a `casework.toml`.
pub struct TestContext {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .expect("Path is not valid UTF-8");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn with_config(config: &str) -> Self {
        let context = Self::new();
        context.write_file("casework.toml", config);
        context
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn write_file(&self, path: impl AsRef<Utf8Path>, content: &str) {
        let path = self.root.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
    }

    /// Loads the project, ignoring overrides from the environment.
    pub fn project(&self) -> anyhow::Result<Project> {
        self.project_in(self.root())
    }

    pub fn project_in(&self, cwd: &Utf8Path) -> anyhow::Result<Project> {
        Ok(Project::discover_with(cwd, &OptionsOverrides::default())?)
    }
}

pub fn ids(calls: &[CallSpec]) -> Vec<&str> {
    calls.iter().map(CallSpec::id).collect()
}

/// A fixture returning its own name.
pub fn constant(name: &str) -> FixtureDef {
    FixtureDef::constant(name, ParamValue::from(name))
}

/// A fixture returning its own name and counting how often it runs.
pub fn counted(name: &str, runs: &Arc<AtomicUsize>) -> FixtureDef {
    let runs = Arc::clone(runs);
    let value = name.to_string();
    FixtureDef::function(name, move |_| {
        runs.fetch_add(1, Ordering::SeqCst);
        Ok(ParamValue::from(value.as_str()))
    })
}

pub fn runs(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
