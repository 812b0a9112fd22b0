//! Error types for memorylake-core.

use thiserror::Error;

use crate::config::ConfigValidationError;

/// Result type alias using memorylake-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for MemoryLake operations
#[derive(Error, Debug)]
pub enum Error {
    // API errors
    #[error("API request failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigValidationError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an error from a non-success HTTP response
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Check if this error came from talking to the service.
    ///
    /// Covers failure statuses, transport failures and undecodable bodies.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Request(_) | Self::Decode(_))
    }

    /// HTTP status of the failed response, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::api(status.as_u16(), err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
