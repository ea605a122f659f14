//! Fire-and-forget feedback bridge
//!
//! Operation settlements are reported to a `NotificationBridge` so the UI can
//! trigger haptic/success/error cues. Bridge implementations must never fail
//! back into the coordinator: the trait is infallible by construction, and
//! implementations swallow and log their own errors.

use crate::types::OperationKind;
use tracing::debug;

/// Receives settlement outcomes for UI feedback (haptics, toasts).
///
/// Calls are fire-and-forget; a bridge failure must never affect store
/// correctness.
pub trait NotificationBridge: Send + Sync {
    /// An operation of the given kind settled successfully.
    fn on_success(&self, kind: OperationKind);

    /// An operation of the given kind settled with a failure.
    fn on_error(&self, kind: OperationKind);
}

/// Bridge that discards all notifications. Useful in tests and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBridge;

impl NotificationBridge for NoopBridge {
    fn on_success(&self, _kind: OperationKind) {}
    fn on_error(&self, _kind: OperationKind) {}
}

/// Bridge that logs notifications through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBridge;

impl NotificationBridge for LoggingBridge {
    fn on_success(&self, kind: OperationKind) {
        debug!("🔔 {} settled successfully", kind);
    }

    fn on_error(&self, kind: OperationKind) {
        debug!("🔔 {} settled with an error", kind);
    }
}
