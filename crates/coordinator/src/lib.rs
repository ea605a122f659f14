//! Operation coordinator for the marketplace core.
//!
//! Wraps each gateway call in a tracked asynchronous operation with three
//! observable phases (pending, fulfilled, rejected) and routes each
//! settlement into the `JobStore` exactly once, regardless of how many
//! operations are concurrently outstanding. Settlements racing on the same
//! job id are resolved by kind priority (remove > update > create), never by
//! wall clock.

mod config;
mod coordinator;
mod error;
mod ledger;
mod logging;
mod tracker;

pub use config::CoordinatorConfig;
pub use coordinator::{OperationCoordinator, Settlement};
pub use error::{CoordinatorError, Result};
pub use ledger::SettlementLedger;
pub use logging::init_logging;
pub use tracker::{OperationPhase, OperationTracker, RequestId};
