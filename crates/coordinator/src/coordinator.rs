use std::sync::Arc;
use tracing::{debug, info, warn};

use marketplace_trait::{
    Bid, BidDraft, GatewayError, Job, JobDraft, JobFilter, JobPatch, JobStatus,
    NotificationBridge, OperationKind, RemoteJobGateway,
};
use store::{BidAppend, BidPolicy, JobStore, StoreError};

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Result};
use crate::ledger::SettlementLedger;
use crate::tracker::{OperationTracker, RequestId};

/// How a settlement landed: applied to the store, or silently discarded
/// because a higher-priority concurrent settlement already altered the same
/// job.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement<T> {
    Applied(T),
    Superseded,
}

impl<T> Settlement<T> {
    /// The applied value, if any.
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Superseded => None,
        }
    }
}

/// Executes one gateway call per logical operation, tracks its phase, and
/// routes its settlement into the store exactly once.
///
/// Operations of different kinds on the same job id may run concurrently;
/// the coordinator never serializes them. Each settlement defends against
/// stale application through the [`SettlementLedger`]. No operation is
/// retried automatically; retry is a caller decision.
#[derive(Clone)]
pub struct OperationCoordinator {
    gateway: Arc<dyn RemoteJobGateway>,
    store: JobStore,
    bridge: Arc<dyn NotificationBridge>,
    tracker: OperationTracker,
    ledger: SettlementLedger,
    config: CoordinatorConfig,
}

impl OperationCoordinator {
    /// Build a coordinator with its own store, derived from the config's bid
    /// policy.
    pub fn new(
        gateway: Arc<dyn RemoteJobGateway>,
        bridge: Arc<dyn NotificationBridge>,
        config: CoordinatorConfig,
    ) -> Self {
        let store = JobStore::with_bid_policy(config.bid_policy);
        Self {
            gateway,
            store,
            bridge,
            tracker: OperationTracker::new(),
            ledger: SettlementLedger::new(),
            config,
        }
    }

    /// The shared store handle; callers read jobs, bids, filter and
    /// selection through it.
    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Per-kind phase and error introspection.
    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    // ===== Operations =====

    /// Execute a filtered query and replace the local collection with the
    /// result. An unreachable gateway degrades to an applied empty result
    /// set instead of propagating; every other failure propagates verbatim.
    pub async fn fetch(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let request = self.tracker.begin(OperationKind::Fetch).await;
        let mut records = match self.gateway.query(&filter).await {
            Ok(records) => records,
            Err(GatewayError::Unavailable { message }) => {
                warn!("Gateway unavailable, degrading fetch to empty result: {}", message);
                Vec::new()
            }
            Err(e) => {
                return Err(self.settle_err(OperationKind::Fetch, request, e.into()).await);
            }
        };
        if let Some(limit) = self.config.fetch_limit {
            if records.len() > limit {
                debug!("Truncating fetch result from {} to {}", records.len(), limit);
                records.truncate(limit);
            }
        }
        // The fetch is the new baseline for settlement precedence
        self.ledger.clear();
        let jobs = self.store.apply_fetch_result(records).await;
        self.settle_ok(OperationKind::Fetch, request).await;
        Ok(jobs)
    }

    /// Validate and create a job. The draft is rejected locally before any
    /// gateway call when mandatory fields are missing.
    pub async fn create(&self, draft: JobDraft) -> Result<Job> {
        draft.validate().map_err(CoordinatorError::validation)?;
        let request = self.tracker.begin(OperationKind::Create).await;
        match self.gateway.insert(&draft).await {
            Ok(job) => {
                self.ledger.record(&job.id, OperationKind::Create);
                if let Err(e) = self.store.apply_create_result(job.clone()).await {
                    return Err(self.settle_err(OperationKind::Create, request, e.into()).await);
                }
                info!("Created job {} for customer {}", job.id, job.customer_id);
                self.settle_ok(OperationKind::Create, request).await;
                Ok(job)
            }
            Err(e) => Err(self.settle_err(OperationKind::Create, request, e.into()).await),
        }
    }

    /// Apply a partial update. The patch must be non-empty; it is otherwise
    /// opaque to the coordinator. A remove settlement that already landed
    /// for the same job supersedes the update.
    pub async fn update(&self, job_id: &str, patch: JobPatch) -> Result<Settlement<Job>> {
        if patch.is_empty() {
            return Err(CoordinatorError::validation("update patch must not be empty"));
        }
        let request = self.tracker.begin(OperationKind::Update).await;
        match self.gateway.patch(job_id, &patch).await {
            Ok(job) => {
                if !self.ledger.admit(job_id, OperationKind::Update) {
                    debug!("Discarding stale update settlement for job {}", job_id);
                    self.settle_ok(OperationKind::Update, request).await;
                    return Ok(Settlement::Superseded);
                }
                match self.store.apply_update_result(job).await {
                    Ok(updated) => {
                        self.settle_ok(OperationKind::Update, request).await;
                        Ok(Settlement::Applied(updated))
                    }
                    Err(e) => {
                        Err(self.settle_err(OperationKind::Update, request, e.into()).await)
                    }
                }
            }
            Err(e) => Err(self.settle_err(OperationKind::Update, request, e.into()).await),
        }
    }

    /// Delete a job. Idempotent at the store: removing an already-absent
    /// job is not an error.
    pub async fn remove(&self, job_id: &str) -> Result<()> {
        let request = self.tracker.begin(OperationKind::Remove).await;
        match self.gateway.delete(job_id).await {
            Ok(()) => {
                self.ledger.record(job_id, OperationKind::Remove);
                self.store.apply_delete_result(job_id).await;
                self.settle_ok(OperationKind::Remove, request).await;
                Ok(())
            }
            Err(e) => Err(self.settle_err(OperationKind::Remove, request, e.into()).await),
        }
    }

    /// Place a bid. The draft is validated locally before any gateway call;
    /// under the reject policy the job must also be present locally. When
    /// the bid turns out to be the job's first and the job is still open, a
    /// coordinated open -> bidding transition follows. A failed bid write
    /// leaves both status and ledger untouched.
    pub async fn bid(&self, job_id: &str, draft: BidDraft) -> Result<Settlement<Bid>> {
        draft.validate().map_err(CoordinatorError::validation)?;
        if self.store.bid_policy() == BidPolicy::Reject && self.store.job(job_id).await.is_none() {
            return Err(StoreError::unknown_job(job_id).into());
        }
        let request = self.tracker.begin(OperationKind::Bid).await;
        match self.gateway.insert_bid(job_id, &draft).await {
            Ok(bid) => {
                if !self.ledger.admit(job_id, OperationKind::Bid) {
                    debug!("Discarding stale bid settlement for removed job {}", job_id);
                    self.settle_ok(OperationKind::Bid, request).await;
                    return Ok(Settlement::Superseded);
                }
                let appended = match self.store.append_bid(job_id, bid.clone()).await {
                    Ok(appended) => appended,
                    Err(e) => {
                        return Err(self.settle_err(OperationKind::Bid, request, e.into()).await);
                    }
                };
                if appended == (BidAppend::Ledgered { ledger_len: 1 }) {
                    self.transition_on_first_bid(job_id).await?;
                }
                self.settle_ok(OperationKind::Bid, request).await;
                Ok(Settlement::Applied(bid))
            }
            Err(e) => Err(self.settle_err(OperationKind::Bid, request, e.into()).await),
        }
    }

    /// User-driven status change on the local collection.
    pub async fn transition_status(
        &self,
        job_id: &str,
        next: JobStatus,
    ) -> Result<Job> {
        Ok(self.store.transition_status(job_id, next).await?)
    }

    /// Clear the store, tracker and ledger (logout path).
    pub async fn reset(&self) {
        self.store.reset().await;
        self.tracker.reset().await;
        self.ledger.clear();
    }

    // ===== Internals =====

    /// First bid on an open job moves it to bidding. The transition is a
    /// separate indivisible step after the bid append and never rolls the
    /// bid back.
    async fn transition_on_first_bid(&self, job_id: &str) -> Result<()> {
        let Some(job) = self.store.job(job_id).await else {
            return Ok(());
        };
        if job.status == JobStatus::Open {
            self.store
                .transition_status(job_id, JobStatus::Bidding)
                .await?;
        }
        Ok(())
    }

    async fn settle_ok(&self, kind: OperationKind, request: RequestId) {
        self.tracker.fulfill(kind, request).await;
        self.bridge.on_success(kind);
    }

    async fn settle_err(
        &self,
        kind: OperationKind,
        request: RequestId,
        error: CoordinatorError,
    ) -> CoordinatorError {
        self.tracker.reject(kind, request, error.to_string()).await;
        self.bridge.on_error(kind);
        error
    }
}
