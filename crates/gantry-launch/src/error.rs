//! Error types for Gantry launch operations.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for the launch pipeline.
///
/// Every variant up to `JobFailed` is raised before any scheduler
/// resources are consumed; there are no partial submissions.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Inconsistent or invalid knob combination. Always
    /// caller-fixable; never retried. The message names the violated
    /// invariant and the offending values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Output directory could not be created for a reason other than
    /// "already exists" (permission denied, parent is a file, ...).
    #[error("Workspace error at {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scheduler rejected the submission. Carries the scheduler's
    /// own diagnostic text.
    #[error("Launch error: {0}")]
    Launch(String),

    /// The launched job exited non-zero. The exit code is forwarded
    /// verbatim, not reinterpreted.
    #[error("Job failed with exit code {exit_code}")]
    JobFailed { exit_code: i32 },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for launch operations.
pub type Result<T> = std::result::Result<T, LaunchError>;
