use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use marketplace_trait::OperationKind;

/// Identifies one dispatched operation instance.
pub type RequestId = u64;

/// Observable phase of the most recent operation of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationPhase {
    /// No operation of this kind dispatched yet
    #[default]
    Idle,
    /// Dispatched, settlement outstanding
    Pending,
    /// Settled successfully
    Fulfilled,
    /// Settled with a failure, message preserved
    Rejected(String),
}

#[derive(Debug, Clone)]
struct OperationState {
    phase: OperationPhase,
    request_id: RequestId,
}

/// Per-kind phase and error tracking.
///
/// Each operation kind has its own phase slot, so a fast fetch settling
/// after a slow create cannot wipe the create's error. Within a kind, the
/// slot follows the most recently dispatched request: settlements carry
/// their request id and are ignored when a newer request of the same kind
/// has already begun.
#[derive(Clone)]
pub struct OperationTracker {
    states: Arc<RwLock<HashMap<OperationKind, OperationState>>>,
    next_request_id: Arc<AtomicU64>,
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationTracker {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Mark a new operation of this kind as pending. Returns the request id
    /// the settlement must present.
    pub async fn begin(&self, kind: OperationKind) -> RequestId {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let mut states = self.states.write().await;
        states.insert(
            kind,
            OperationState {
                phase: OperationPhase::Pending,
                request_id,
            },
        );
        debug!("Operation {} #{} pending", kind, request_id);
        request_id
    }

    /// Mark the operation as fulfilled, unless a newer request of the same
    /// kind has begun since.
    pub async fn fulfill(&self, kind: OperationKind, request_id: RequestId) {
        let mut states = self.states.write().await;
        match states.get_mut(&kind) {
            Some(state) if state.request_id == request_id => {
                state.phase = OperationPhase::Fulfilled;
                debug!("Operation {} #{} fulfilled", kind, request_id);
            }
            _ => {
                debug!(
                    "Ignoring fulfilled settlement for superseded {} #{}",
                    kind, request_id
                );
            }
        }
    }

    /// Mark the operation as rejected, unless a newer request of the same
    /// kind has begun since.
    pub async fn reject(&self, kind: OperationKind, request_id: RequestId, message: String) {
        let mut states = self.states.write().await;
        match states.get_mut(&kind) {
            Some(state) if state.request_id == request_id => {
                debug!("Operation {} #{} rejected: {}", kind, request_id, message);
                state.phase = OperationPhase::Rejected(message);
            }
            _ => {
                debug!(
                    "Ignoring rejected settlement for superseded {} #{}",
                    kind, request_id
                );
            }
        }
    }

    /// Current phase for a kind.
    pub async fn phase(&self, kind: OperationKind) -> OperationPhase {
        let states = self.states.read().await;
        states
            .get(&kind)
            .map(|state| state.phase.clone())
            .unwrap_or_default()
    }

    /// Last rejection message for a kind, if its most recent settlement
    /// failed.
    pub async fn last_error(&self, kind: OperationKind) -> Option<String> {
        match self.phase(kind).await {
            OperationPhase::Rejected(message) => Some(message),
            _ => None,
        }
    }

    /// Whether an operation of this kind is outstanding.
    pub async fn is_pending(&self, kind: OperationKind) -> bool {
        self.phase(kind).await == OperationPhase::Pending
    }

    /// Whether any operation is outstanding.
    pub async fn any_pending(&self) -> bool {
        let states = self.states.read().await;
        states
            .values()
            .any(|state| state.phase == OperationPhase::Pending)
    }

    /// Forget all phases (store reset path).
    pub async fn reset(&self) {
        let mut states = self.states.write().await;
        states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_phases_are_tracked_per_kind() {
        let tracker = OperationTracker::new();
        let fetch = tracker.begin(OperationKind::Fetch).await;
        let create = tracker.begin(OperationKind::Create).await;

        tracker
            .reject(OperationKind::Create, create, "boom".to_string())
            .await;
        tracker.fulfill(OperationKind::Fetch, fetch).await;

        // The fetch settling does not clobber the create's error
        assert_eq!(tracker.phase(OperationKind::Fetch).await, OperationPhase::Fulfilled);
        assert_eq!(
            tracker.last_error(OperationKind::Create).await.as_deref(),
            Some("boom")
        );
        assert_eq!(tracker.phase(OperationKind::Update).await, OperationPhase::Idle);
    }

    #[tokio::test]
    async fn test_superseded_settlement_is_ignored() {
        let tracker = OperationTracker::new();
        let first = tracker.begin(OperationKind::Update).await;
        let _second = tracker.begin(OperationKind::Update).await;

        // The first request settles after the second was dispatched
        tracker.fulfill(OperationKind::Update, first).await;
        assert!(tracker.is_pending(OperationKind::Update).await);
    }

    #[tokio::test]
    async fn test_any_pending() {
        let tracker = OperationTracker::new();
        assert!(!tracker.any_pending().await);

        let id = tracker.begin(OperationKind::Bid).await;
        assert!(tracker.any_pending().await);

        tracker.fulfill(OperationKind::Bid, id).await;
        assert!(!tracker.any_pending().await);
    }
}
