//! Marketplace Trait - Core abstraction for the job marketplace gateway
//!
//! This crate defines the `RemoteJobGateway` trait which provides a unified
//! interface to the remote data store (CRUD + filtered query), together with
//! the entity types shared by the store and the coordinator, and the
//! `NotificationBridge` used for fire-and-forget UI feedback.

use async_trait::async_trait;

pub mod bridge;
pub mod error;
pub mod types;

pub use bridge::{LoggingBridge, NoopBridge, NotificationBridge};
pub use error::{GatewayError, GatewayResult};
pub use types::*;

/// Read/write boundary to the remote data store.
///
/// Implementations are responsible for persistence-layer concerns such as
/// denormalizing related records (a queried job carries its bids embedded in
/// the returned [`JobRecord`]). The gateway never mutates local state; it only
/// reports what the remote accepted.
#[async_trait]
pub trait RemoteJobGateway: Send + Sync {
    /// Execute a filtered query and return the matching jobs with their
    /// denormalized bid ledgers.
    async fn query(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, GatewayError>;

    /// Insert a new job built from the draft. The remote assigns the id.
    async fn insert(&self, draft: &JobDraft) -> Result<Job, GatewayError>;

    /// Apply a partial update to an existing job and return the full record
    /// as stored remotely.
    async fn patch(&self, job_id: &str, fields: &JobPatch) -> Result<Job, GatewayError>;

    /// Delete a job by id.
    async fn delete(&self, job_id: &str) -> Result<(), GatewayError>;

    /// Insert a bid against a job. The remote assigns the bid id.
    async fn insert_bid(&self, job_id: &str, draft: &BidDraft) -> Result<Bid, GatewayError>;
}
