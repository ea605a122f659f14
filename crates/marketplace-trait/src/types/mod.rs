//! Shared entity types for the marketplace core

mod bid;
mod filter;
mod job;
mod operation;

pub use bid::{Bid, BidDraft};
pub use filter::JobFilter;
pub use job::{Job, JobDraft, JobPatch, JobRecord, JobStatus};
pub use operation::OperationKind;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
