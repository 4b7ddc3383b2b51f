//! Error types for the Gluepipe clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when calling an external service
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed")]
    RequestFailed(#[from] reqwest::Error),

    /// The service answered with an error status
    #[error("{service} error (status {status}): {code}: {message}")]
    ServiceError {
        /// Service signing name (e.g. "glue")
        service: &'static str,
        /// HTTP status code
        status: u16,
        /// AWS error code (e.g. "EntityNotFoundException")
        code: String,
        /// Error message from the service
        message: String,
    },

    /// Failed to parse or build a payload
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Object storage operation failed
    #[error("Object storage error")]
    StorageError(#[from] object_store::Error),

    /// Local file access failed
    #[error("I/O error")]
    IoError(#[from] std::io::Error),

    /// Credentials are missing from the environment
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Endpoint URL could not be used
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ClientError {
    /// Create a service error from status code, error code and message
    pub fn service_error(
        service: &'static str,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ServiceError {
            service,
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// AWS error code, if the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ServiceError { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ServiceError { status: 404, .. } => true,
            Self::ServiceError { code, .. } => {
                code.ends_with("DoesNotExistException") || code == "EntityNotFoundException"
            }
            Self::StorageError(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }
}
