//! Error types for the lanesim environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The process did not expose the path of the executed script
    #[error("Missing script path: {0}")]
    MissingScriptPath(String),

    /// The current working directory could not be determined
    #[error("Working directory unavailable: {0}")]
    WorkingDirectory(#[from] std::io::Error),

    /// Pacing parameters are unusable (zero, negative or non-finite)
    #[error("Invalid pacing: {0}")]
    InvalidPacing(String),
}

impl EnvError {
    /// Creates a missing-script-path error.
    pub fn missing_script(msg: impl Into<String>) -> Self {
        Self::MissingScriptPath(msg.into())
    }

    /// Creates an invalid-pacing error.
    pub fn pacing(msg: impl Into<String>) -> Self {
        Self::InvalidPacing(msg.into())
    }
}
