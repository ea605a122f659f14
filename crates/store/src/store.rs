use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use marketplace_trait::{now_ms, Bid, Job, JobFilter, JobRecord, JobStatus};

use crate::error::{StoreError, StoreResult};

/// Policy for bids arriving for jobs not present locally (e.g. posted by
/// another client and not yet fetched).
///
/// `Reject` surfaces `UnknownJob` to the caller; `Buffer` parks the bid and
/// drains it into the ledger when the job arrives via a later fetch. The
/// default is `Reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BidPolicy {
    #[default]
    Reject,
    Buffer,
}

/// Outcome of appending a bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidAppend {
    /// Appended to the job's ledger; carries the new ledger length
    Ledgered { ledger_len: usize },
    /// Parked for a job not yet fetched (Buffer policy only)
    Buffered,
}

#[derive(Default)]
struct StoreInner {
    /// Display order: most-recent-first on create, fetch order otherwise
    jobs: Vec<Job>,
    /// Per-job bid ledgers, insertion order = arrival order
    bids: HashMap<String, Vec<Bid>>,
    /// Bids parked for jobs not yet fetched (Buffer policy only)
    buffered_bids: HashMap<String, Vec<Bid>>,
    /// Active query filter
    filter: JobFilter,
    /// Job currently open in a detail view; a UI pointer, not ownership
    selected: Option<String>,
    /// When the last successful fetch was applied (epoch ms)
    last_fetch_at: Option<u64>,
}

/// The authoritative in-memory collection of jobs and bids.
///
/// Cheaply cloneable handle; all clones share the same state. Methods are
/// async but each mutation holds the write lock for a single indivisible
/// step, matching the cooperative single-threaded model of the callers.
#[derive(Clone)]
pub struct JobStore {
    inner: Arc<RwLock<StoreInner>>,
    bid_policy: BidPolicy,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    /// Create an empty store with the default (reject) bid policy.
    pub fn new() -> Self {
        Self::with_bid_policy(BidPolicy::Reject)
    }

    /// Create an empty store with an explicit bid policy.
    pub fn with_bid_policy(bid_policy: BidPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            bid_policy,
        }
    }

    /// The bid policy this store was built with.
    pub fn bid_policy(&self) -> BidPolicy {
        self.bid_policy
    }

    // ===== Read surface =====

    /// Snapshot of the jobs matching the filter, in display order.
    pub async fn list_jobs(&self, filter: &JobFilter) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .jobs
            .iter()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect()
    }

    /// Snapshot of a single job by id.
    pub async fn job(&self, job_id: &str) -> Option<Job> {
        let inner = self.inner.read().await;
        inner.jobs.iter().find(|job| job.id == job_id).cloned()
    }

    /// Snapshot of a job's bid ledger, in arrival order.
    pub async fn bids_for(&self, job_id: &str) -> Vec<Bid> {
        let inner = self.inner.read().await;
        inner.bids.get(job_id).cloned().unwrap_or_default()
    }

    /// Number of ledgered bids for a job.
    pub async fn bid_count(&self, job_id: &str) -> usize {
        let inner = self.inner.read().await;
        inner.bids.get(job_id).map(|b| b.len()).unwrap_or(0)
    }

    /// Total number of jobs held.
    pub async fn jobs_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.jobs.len()
    }

    /// The active filter.
    pub async fn filter(&self) -> JobFilter {
        let inner = self.inner.read().await;
        inner.filter.clone()
    }

    /// The currently selected job, if it is still present.
    pub async fn selected_job(&self) -> Option<Job> {
        let inner = self.inner.read().await;
        let selected = inner.selected.as_ref()?;
        inner.jobs.iter().find(|job| &job.id == selected).cloned()
    }

    /// When the last successful fetch was applied (epoch ms).
    pub async fn last_fetch_at(&self) -> Option<u64> {
        let inner = self.inner.read().await;
        inner.last_fetch_at
    }

    // ===== Settlement application =====

    /// Replace the full collection with a fetch result. Last successful
    /// fetch wins: existing jobs and ledgers are dropped, not merged. Under
    /// the Buffer policy, parked bids for jobs that arrived are drained into
    /// their ledgers. Returns a snapshot of the stored jobs.
    pub async fn apply_fetch_result(&self, records: Vec<JobRecord>) -> Vec<Job> {
        let mut inner = self.inner.write().await;
        inner.jobs = Vec::with_capacity(records.len());
        inner.bids = HashMap::with_capacity(records.len());
        for record in records {
            let mut ledger = record.bids;
            if let Some(parked) = inner.buffered_bids.remove(&record.job.id) {
                debug!(
                    "Draining {} buffered bid(s) into job {}",
                    parked.len(),
                    record.job.id
                );
                // The remote copy of a parked bid may already be embedded
                for bid in parked {
                    if !ledger.iter().any(|existing| existing.id == bid.id) {
                        ledger.push(bid);
                    }
                }
            }
            inner.bids.insert(record.job.id.clone(), ledger);
            inner.jobs.push(record.job);
        }
        // A selection pointing at a job the fetch no longer contains is stale
        if let Some(selected) = inner.selected.clone() {
            if !inner.jobs.iter().any(|job| job.id == selected) {
                debug!("Clearing selection {}: not in fetch result", selected);
                inner.selected = None;
            }
        }
        inner.last_fetch_at = Some(now_ms());
        info!("Applied fetch result: {} job(s)", inner.jobs.len());
        inner.jobs.clone()
    }

    /// Insert a newly created job at the front of the collection
    /// (most-recent-first display convention). No-op if the id already
    /// exists.
    pub async fn apply_create_result(&self, job: Job) -> StoreResult<()> {
        job.validate().map_err(StoreError::validation)?;
        let mut inner = self.inner.write().await;
        if inner.jobs.iter().any(|existing| existing.id == job.id) {
            warn!("Create settlement for existing job {}", job.id);
            return Err(StoreError::duplicate_job(&job.id));
        }
        debug!("Inserting created job {} ({})", job.id, job.status);
        let job_id = job.id.clone();
        inner.jobs.insert(0, job);
        if let Some(parked) = inner.buffered_bids.remove(&job_id) {
            inner.bids.insert(job_id, parked);
        }
        Ok(())
    }

    /// Replace the job with the matching id in place, preserving positional
    /// order. The update is dropped with `UnknownJob` when local and remote
    /// state have diverged.
    pub async fn apply_update_result(&self, mut job: Job) -> StoreResult<Job> {
        job.updated_at = now_ms();
        job.validate().map_err(StoreError::validation)?;
        let mut inner = self.inner.write().await;
        let Some(position) = inner.jobs.iter().position(|existing| existing.id == job.id) else {
            warn!("Update settlement for unknown job {}", job.id);
            return Err(StoreError::unknown_job(&job.id));
        };
        debug!("Replacing job {} at position {}", job.id, position);
        inner.jobs[position] = job.clone();
        Ok(job)
    }

    /// Remove a job and its ledger. Idempotent: deleting an absent job is
    /// not an error. Returns whether anything was removed.
    pub async fn apply_delete_result(&self, job_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|job| job.id != job_id);
        let removed = inner.jobs.len() < before;
        inner.bids.remove(job_id);
        inner.buffered_bids.remove(job_id);
        if inner.selected.as_deref() == Some(job_id) {
            inner.selected = None;
        }
        if removed {
            debug!("Removed job {}", job_id);
        } else {
            debug!("Delete settlement for absent job {} (idempotent)", job_id);
        }
        removed
    }

    // ===== Status transitions =====

    /// Validate and apply a status transition. On entry to `Completed` the
    /// job is stamped with `completed_at` exactly once. Returns the updated
    /// job.
    pub async fn transition_status(&self, job_id: &str, next: JobStatus) -> StoreResult<Job> {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.iter_mut().find(|job| job.id == job_id) else {
            return Err(StoreError::unknown_job(job_id));
        };
        if !job.status.can_transition_to(next) {
            warn!(
                "Rejected status transition {} -> {} for job {}",
                job.status, next, job_id
            );
            return Err(StoreError::InvalidTransition {
                from: job.status,
                to: next,
            });
        }
        let from = job.status;
        job.status = next;
        job.updated_at = now_ms();
        if next == JobStatus::Completed && job.completed_at.is_none() {
            job.completed_at = Some(job.updated_at);
        }
        info!("Job {} transitioned {} -> {}", job_id, from, next);
        Ok(job.clone())
    }

    // ===== Bid ledgers =====

    /// Append a bid to a job's ledger. Requires the job to be present under
    /// the Reject policy; parks the bid under the Buffer policy.
    pub async fn append_bid(&self, job_id: &str, bid: Bid) -> StoreResult<BidAppend> {
        let mut inner = self.inner.write().await;
        if inner.jobs.iter().any(|job| job.id == job_id) {
            let ledger = inner.bids.entry(job_id.to_string()).or_default();
            ledger.push(bid);
            let ledger_len = ledger.len();
            debug!("Appended bid to job {} (ledger now {})", job_id, ledger_len);
            return Ok(BidAppend::Ledgered { ledger_len });
        }
        match self.bid_policy {
            BidPolicy::Reject => Err(StoreError::unknown_job(job_id)),
            BidPolicy::Buffer => {
                debug!("Buffering bid for unfetched job {}", job_id);
                inner
                    .buffered_bids
                    .entry(job_id.to_string())
                    .or_default()
                    .push(bid);
                Ok(BidAppend::Buffered)
            }
        }
    }

    /// Remove one bid from a job's ledger. Idempotent; returns whether a bid
    /// was removed.
    pub async fn remove_bid(&self, job_id: &str, bid_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(ledger) = inner.bids.get_mut(job_id) else {
            return false;
        };
        let before = ledger.len();
        ledger.retain(|bid| bid.id != bid_id);
        let removed = ledger.len() < before;
        if removed {
            debug!("Removed bid {} from job {}", bid_id, job_id);
        }
        removed
    }

    // ===== Filter and selection =====

    /// Overlay the set fields of `partial` onto the active filter. Job data
    /// is untouched.
    pub async fn set_filter(&self, partial: JobFilter) {
        let mut inner = self.inner.write().await;
        inner.filter.merge(partial);
    }

    /// Reset the active filter to match everything.
    pub async fn clear_filter(&self) {
        let mut inner = self.inner.write().await;
        inner.filter = JobFilter::any();
    }

    /// Track the job currently open in a detail view.
    pub async fn select_job(&self, job_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.jobs.iter().any(|job| job.id == job_id) {
            return Err(StoreError::unknown_job(job_id));
        }
        inner.selected = Some(job_id.to_string());
        Ok(())
    }

    /// Clear the detail-view pointer.
    pub async fn clear_selection(&self) {
        let mut inner = self.inner.write().await;
        inner.selected = None;
    }

    /// Clear everything (logout path).
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        let dropped = inner.jobs.len();
        *inner = StoreInner::default();
        info!("Store reset, dropped {} job(s)", dropped);
    }
}
