use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use marketplace_trait::OperationKind;

/// Records the highest settlement priority applied per job id.
///
/// Settlements for the same job id may settle in any order; the ledger
/// enforces the kind-priority rule (remove > update > create) so a slow
/// update settling after a remove cannot resurrect the job. Entries are
/// dropped wholesale when a fetch re-baselines the store.
#[derive(Clone, Default)]
pub struct SettlementLedger {
    applied: Arc<Mutex<HashMap<String, u8>>>,
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a settlement of this kind may still be applied for the
    /// job, recording its priority when admitted. Returns `false` when a
    /// higher-priority settlement already landed; the caller then discards
    /// the settlement silently.
    pub fn admit(&self, job_id: &str, kind: OperationKind) -> bool {
        let priority = kind.settlement_priority();
        let mut applied = self.applied.lock();
        if let Some(&existing) = applied.get(job_id) {
            // Kinds outside the ladder (fetch, bid) are only blocked by a
            // remove; ladder kinds lose to any higher-priority settlement
            let blocked = if priority == 0 {
                existing == OperationKind::Remove.settlement_priority()
            } else {
                existing > priority
            };
            if blocked {
                debug!(
                    "Settlement {} for job {} superseded (priority {} < {})",
                    kind, job_id, priority, existing
                );
                return false;
            }
        }
        if priority > 0 {
            applied.insert(job_id.to_string(), priority);
        }
        true
    }

    /// Record a settlement unconditionally (remove and create settlements
    /// always land; they only raise the recorded priority).
    pub fn record(&self, job_id: &str, kind: OperationKind) {
        let priority = kind.settlement_priority();
        if priority == 0 {
            return;
        }
        let mut applied = self.applied.lock();
        let entry = applied.entry(job_id.to_string()).or_insert(0);
        if priority > *entry {
            *entry = priority;
        }
    }

    /// Forget everything (fetch and reset paths).
    pub fn clear(&self) {
        self.applied.lock().clear();
    }
}
