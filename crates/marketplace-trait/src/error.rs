//! Error types for gateway operations

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors reported by the remote data store boundary.
///
/// Messages coming back from the remote are preserved verbatim so callers can
/// decide whether to retry or surface them to the user.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The remote store could not be reached or is not configured
    #[error("Gateway unavailable: {message}")]
    Unavailable { message: String },

    /// The remote accepted the connection but the request itself failed
    #[error("{operation} request failed: {message}")]
    RequestFailed { operation: String, message: String },

    /// Resource not found on the remote
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Data serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Wrapper for other error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a request failure for the given operation
    pub fn request_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error means the remote is unreachable (as opposed to a
    /// request-level failure)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
