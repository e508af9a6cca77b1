//! MB-007: Error types for configuration, transfer and command failures.

use std::io;
use thiserror::Error;

/// Every way a moby run can stop early.
#[derive(Debug, Error)]
pub enum MobyError {
    /// A command inside the container exited with a nonzero code.
    #[error("command exited with code {0}")]
    AbnormalExit(i32),

    /// Archive build, fetch, upload or extraction failed.
    #[error("transfer of '{path}' failed: {source}")]
    Transfer {
        path: String,
        #[source]
        source: io::Error,
    },

    /// moby.yml is missing, malformed, or references unknown environments.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A call into the container engine failed outside a transfer.
    #[error("container engine error: {0}")]
    Engine(#[from] io::Error),
}

impl MobyError {
    /// Process exit status for this error.
    ///
    /// An abnormal exit propagates the command's own code unchanged;
    /// everything else is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AbnormalExit(code) => *code,
            _ => 1,
        }
    }

    pub(crate) fn transfer(path: impl Into<String>, source: io::Error) -> Self {
        Self::Transfer {
            path: path.into(),
            source,
        }
    }
}

/// Result type for moby operations
pub type Result<T> = std::result::Result<T, MobyError>;
