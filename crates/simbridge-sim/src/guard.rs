//! Scoped scenario file for the duration of a run.

use std::path::{Path, PathBuf};

use simbridge_core::Result;
use simbridge_core::error::EngineError;
use simbridge_env::Environment;
use tracing::{debug, warn};

/// Saves the scenario to `<dir>/<dir-name>.pb` and deletes the file when
/// dropped.
#[derive(Debug)]
pub struct ExperimentGuard {
    path: PathBuf,
}

impl ExperimentGuard {
    /// Save into the current working directory.
    pub fn new(env: &Environment) -> Result<Self> {
        let dir = std::env::current_dir().map_err(EngineError::from)?;
        Self::in_dir(env, dir)
    }

    pub fn in_dir(env: &Environment, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let stem = dir
            .file_name()
            .map_or_else(|| "experiment".to_owned(), |name| name.to_string_lossy().into_owned());
        let path = dir.join(format!("{stem}.pb"));
        env.save_experiment(&path)?;
        debug!(path = %path.display(), "experiment file written");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExperimentGuard {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %err, "failed to remove experiment file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbridge_engine::HeadlessEngine;

    #[test]
    fn file_lives_as_long_as_the_guard() {
        let dir = tempfile::tempdir().unwrap();
        let scenario_dir = dir.path().join("highway");
        std::fs::create_dir(&scenario_dir).unwrap();
        let env = Environment::new(HeadlessEngine::new());

        let guard = ExperimentGuard::in_dir(&env, &scenario_dir).unwrap();
        assert_eq!(guard.path(), scenario_dir.join("highway.pb"));
        assert!(guard.path().is_file());

        let path = guard.path().to_path_buf();
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new(HeadlessEngine::new());
        assert!(ExperimentGuard::in_dir(&env, dir.path().join("missing")).is_err());
    }
}
