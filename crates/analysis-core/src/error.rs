//! Error types for analysis-core

use thiserror::Error;

/// Result type alias for analysis-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for analysis job operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Submission input rejected before any network call
    #[error("Invalid analysis request: {0}")]
    Validation(String),

    /// Network or backend failure on submit, poll or cancel
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend reported a failure of the job itself
    #[error("Analysis failed: {0}")]
    Backend(String),

    /// A push frame could not be decoded
    #[error("Malformed update frame: {0}")]
    Protocol(String),
}

impl Error {
    /// Whether the error was raised before anything left the process
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Protocol(err.to_string())
    }
}
