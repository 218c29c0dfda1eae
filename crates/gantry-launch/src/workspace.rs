//! Output workspace management.
//!
//! The output directory outlives any single launch and accumulates
//! history across reruns; nothing here ever truncates an existing log.

use crate::error::{LaunchError, Result};
use std::path::{Path, PathBuf};

/// Name of the append-only capture log inside the output directory.
pub const LOG_FILE_NAME: &str = "training_log.txt";

/// A resolved, existing output directory for one experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputWorkspace {
    root: PathBuf,
    log_file: PathBuf,
}

impl OutputWorkspace {
    /// Ensure `path` exists (creating missing parents) and resolve the
    /// log file path. Idempotent: a pre-existing directory is success,
    /// and the log file is neither opened nor truncated here.
    pub fn ensure(path: impl Into<PathBuf>) -> Result<Self> {
        let root: PathBuf = path.into();
        std::fs::create_dir_all(&root).map_err(|source| LaunchError::Workspace {
            path: root.clone(),
            source,
        })?;
        let log_file = root.join(LOG_FILE_NAME);
        Ok(Self { root, log_file })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_creates_missing_parents() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("work_dirs").join("exp1");
        let ws = OutputWorkspace::ensure(&target).unwrap();
        assert!(target.is_dir());
        assert_eq!(ws.log_file(), target.join(LOG_FILE_NAME));
    }

    #[test]
    fn test_ensure_is_idempotent_and_preserves_log() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("exp2");

        let ws = OutputWorkspace::ensure(&target).unwrap();
        std::fs::write(ws.log_file(), "run 1 output\n").unwrap();

        // Second ensure: no error, log untouched.
        let ws2 = OutputWorkspace::ensure(&target).unwrap();
        assert_eq!(ws, ws2);
        let contents = std::fs::read_to_string(ws2.log_file()).unwrap();
        assert_eq!(contents, "run 1 output\n");
    }

    #[test]
    fn test_ensure_fails_when_parent_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = OutputWorkspace::ensure(blocker.join("exp3")).unwrap_err();
        match err {
            LaunchError::Workspace { path, .. } => {
                assert!(path.ends_with("exp3"));
            }
            other => panic!("Expected Workspace error, got {other:?}"),
        }
    }
}
