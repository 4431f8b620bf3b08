//! Failures of the wrapper itself.
//!
//! A git process that runs and exits non-zero is not an error here; it comes
//! back as an [`ExecutionResult`](crate::executor::ExecutionResult).

use std::path::PathBuf;
use std::time::Duration;

/// Errors from launching or supervising a git process.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// No arguments were given.
    #[error("git invocation requires at least one argument")]
    EmptyArgs,

    /// The git executable could not be found.
    #[error("git executable not found at {}", path.display())]
    GitNotFound {
        /// The path or name that was looked up.
        path: PathBuf,
    },

    /// The working directory does not exist.
    #[error("working directory {} does not exist", path.display())]
    WorkingDirectoryMissing {
        /// The requested working directory.
        path: PathBuf,
    },

    /// The process could not be started for another reason (e.g. permission denied).
    #[error("failed to launch {}: {source}", path.display())]
    Launch {
        /// The executable that failed to start.
        path: PathBuf,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The invocation did not finish in time and was terminated.
    #[error("git did not finish within {timeout:?} and was terminated")]
    Timeout {
        /// The time limit that elapsed.
        timeout: Duration,
    },

    /// The invocation was cancelled and terminated.
    #[error("git invocation was cancelled")]
    Cancelled,

    /// Stdout or stderr grew past the configured cap and the process was terminated.
    #[error("git output exceeded {limit} bytes")]
    OutputLimitExceeded {
        /// The cap in bytes.
        limit: usize,
        /// Stderr read before termination, at most `limit` bytes, decoded lossily.
        stderr: String,
    },

    /// I/O error while talking to a running process.
    #[error("git IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Whether the process never started.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::EmptyArgs
                | Self::GitNotFound { .. }
                | Self::WorkingDirectoryMissing { .. }
                | Self::Launch { .. }
        )
    }

    /// Whether the process was terminated by a timeout or cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled)
    }
}
