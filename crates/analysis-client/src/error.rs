//! Error types for backend communication

use analysis_utils::ConfigError;
use thiserror::Error;

/// Result type alias for analysis-client
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the analysis backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The backend answered with a non-success status
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Client could not be constructed from its configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether repeating an idempotent request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) | Self::Config(_) => false,
        }
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Convert ClientError to analysis_core::Error
impl From<ClientError> for analysis_core::Error {
    fn from(err: ClientError) -> Self {
        analysis_core::Error::Transport(err.to_string())
    }
}
