//! Error types for NGSI client operations

use ngsi_core::NgsiError;
use thiserror::Error;

/// Result type alias for NGSI client operations
pub type Result<T> = std::result::Result<T, NgsiClientError>;

/// Errors that can occur during NGSI client operations
#[derive(Error, Debug)]
pub enum NgsiClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Payload or header rejected by the context model
    #[error("Invalid model: {0}")]
    Model(#[from] NgsiError),

    /// Id or name that cannot be used as a URL path segment
    #[error("Invalid path segment: '{0}'")]
    InvalidPathSegment(String),

    /// Server returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Entity, attribute, subscription, group or device not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource exists already
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl NgsiClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status reported by the server, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
