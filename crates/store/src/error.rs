//! Error types for store operations

use marketplace_trait::JobStatus;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures resolved locally by the store; the state is left unchanged in
/// every case.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A status change was requested that is not a permitted edge
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// The targeted job id is not present locally (local/remote divergence)
    #[error("Unknown job: {id}")]
    UnknownJob { id: String },

    /// A create settlement carried an id that already exists locally
    #[error("Duplicate job: {id}")]
    DuplicateJob { id: String },

    /// An entity violated its invariants
    #[error("Validation failed: {message}")]
    Validation { message: String },
}

impl StoreError {
    /// Create an unknown job error
    pub fn unknown_job(id: impl Into<String>) -> Self {
        Self::UnknownJob { id: id.into() }
    }

    /// Create a duplicate job error
    pub fn duplicate_job(id: impl Into<String>) -> Self {
        Self::DuplicateJob { id: id.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
