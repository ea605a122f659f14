use marketplace_trait::GatewayError;
use store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// A draft or patch was rejected before any gateway call was made
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Gateway-origin failure, message preserved verbatim
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Locally resolved store failure (invalid transition, divergence)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoordinatorError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
