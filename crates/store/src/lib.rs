//! Canonical client-side view of jobs, bids, filters and selection.
//!
//! `JobStore` applies coordinator settlements and user-driven status changes
//! as atomic state transitions. It is the only shared mutable state in the
//! core; every public mutation takes the write lock exactly once, so readers
//! never observe a partial write.

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{BidAppend, BidPolicy, JobStore};
