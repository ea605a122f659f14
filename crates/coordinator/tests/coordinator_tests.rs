use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::sync::RwLock;
use uuid::Uuid;

use coordinator::{
    CoordinatorConfig, CoordinatorError, OperationCoordinator, OperationPhase, Settlement,
};
use marketplace_trait::{
    now_ms, Bid, BidDraft, GatewayError, Job, JobDraft, JobFilter, JobPatch, JobRecord, JobStatus,
    NotificationBridge, OperationKind, RemoteJobGateway,
};
use store::{BidPolicy, StoreError};

/// Gate for holding a patch settlement open while other operations land.
struct PatchGate {
    /// Signalled by the gateway once the patch result has been computed
    entered: Arc<Notify>,
    /// Released by the test to let the patch settle
    release: Arc<Notify>,
}

/// In-memory gateway with failure injection and settlement gating.
#[derive(Default)]
struct MemoryGateway {
    jobs: RwLock<HashMap<String, Job>>,
    bids: RwLock<HashMap<String, Vec<Bid>>>,
    unavailable: AtomicBool,
    fail_next_insert_bid: AtomicBool,
    calls: AtomicUsize,
    patch_gate: Mutex<Option<PatchGate>>,
}

impl MemoryGateway {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn fail_next_insert_bid(&self) {
        self.fail_next_insert_bid.store(true, Ordering::SeqCst);
    }

    /// Arm the patch gate; returns (entered, release) notifies.
    fn gate_next_patch(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.patch_gate.lock() = Some(PatchGate {
            entered: entered.clone(),
            release: release.clone(),
        });
        (entered, release)
    }

    /// Insert a job server-side without going through the coordinator, as if
    /// another client had posted it.
    async fn seed_job(&self, id: &str, customer_id: &str) -> Job {
        let job = Job {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            mechanic_id: None,
            status: JobStatus::Open,
            category: "brakes".to_string(),
            title: "Seeded".to_string(),
            description: None,
            photos: vec![],
            created_at: now_ms(),
            updated_at: now_ms(),
            completed_at: None,
        };
        self.jobs.write().await.insert(id.to_string(), job.clone());
        job
    }

    fn check_available(&self, operation: &str) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::unavailable(format!(
                "remote store unreachable during {}",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteJobGateway for MemoryGateway {
    async fn query(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available("query")?;
        let jobs = self.jobs.read().await;
        let bids = self.bids.read().await;
        Ok(jobs
            .values()
            .filter(|job| filter.matches(job))
            .map(|job| JobRecord {
                job: job.clone(),
                bids: bids.get(&job.id).cloned().unwrap_or_default(),
            })
            .collect())
    }

    async fn insert(&self, draft: &JobDraft) -> Result<Job, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available("insert")?;
        let job = Job {
            id: Uuid::new_v4().to_string(),
            customer_id: draft.customer_id.clone(),
            mechanic_id: None,
            status: JobStatus::Open,
            category: draft.category.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            photos: draft.photos.clone(),
            created_at: now_ms(),
            updated_at: now_ms(),
            completed_at: None,
        };
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn patch(&self, job_id: &str, fields: &JobPatch) -> Result<Job, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available("patch")?;
        let patched = {
            let jobs = self.jobs.read().await;
            let job = jobs
                .get(job_id)
                .ok_or_else(|| GatewayError::not_found("job", job_id))?;
            let mut value = serde_json::to_value(job)
                .map_err(|e| GatewayError::serialization(e.to_string()))?;
            if let Some(object) = value.as_object_mut() {
                for (key, field) in fields {
                    object.insert(key.clone(), field.clone());
                }
            }
            serde_json::from_value::<Job>(value)
                .map_err(|e| GatewayError::serialization(e.to_string()))?
        };
        let gate = self.patch_gate.lock().take();
        if let Some(gate) = gate {
            // Row was read; hold the settlement until the test releases it
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job_id) {
            jobs.insert(job_id.to_string(), patched.clone());
        }
        Ok(patched)
    }

    async fn delete(&self, job_id: &str) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available("delete")?;
        self.jobs.write().await.remove(job_id);
        self.bids.write().await.remove(job_id);
        Ok(())
    }

    async fn insert_bid(&self, job_id: &str, draft: &BidDraft) -> Result<Bid, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_available("insert_bid")?;
        if self.fail_next_insert_bid.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::request_failed(
                "insert_bid",
                "constraint violation",
            ));
        }
        let bid = Bid {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            mechanic_id: draft.mechanic_id.clone(),
            amount: draft.amount,
            message: draft.message.clone(),
            created_at: now_ms(),
        };
        self.bids
            .write()
            .await
            .entry(job_id.to_string())
            .or_default()
            .push(bid.clone());
        Ok(bid)
    }
}

/// Bridge that records every notification it receives.
#[derive(Default)]
struct RecordingBridge {
    events: Mutex<Vec<(OperationKind, bool)>>,
}

impl RecordingBridge {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn events(&self) -> Vec<(OperationKind, bool)> {
        self.events.lock().clone()
    }
}

impl NotificationBridge for RecordingBridge {
    fn on_success(&self, kind: OperationKind) {
        self.events.lock().push((kind, true));
    }

    fn on_error(&self, kind: OperationKind) {
        self.events.lock().push((kind, false));
    }
}

fn setup() -> (Arc<MemoryGateway>, Arc<RecordingBridge>, OperationCoordinator) {
    setup_with_config(CoordinatorConfig::default())
}

fn setup_with_config(
    config: CoordinatorConfig,
) -> (Arc<MemoryGateway>, Arc<RecordingBridge>, OperationCoordinator) {
    dotenvy::dotenv().ok();
    let gateway = MemoryGateway::new();
    let bridge = RecordingBridge::new();
    let coordinator = OperationCoordinator::new(gateway.clone(), bridge.clone(), config);
    (gateway, bridge, coordinator)
}

fn draft(customer_id: &str, category: &str) -> JobDraft {
    JobDraft {
        customer_id: customer_id.to_string(),
        category: category.to_string(),
        title: "Squeaky brakes".to_string(),
        ..Default::default()
    }
}

fn bid_draft(amount: f64) -> BidDraft {
    BidDraft {
        mechanic_id: "mech-1".to_string(),
        amount,
        message: None,
    }
}

#[tokio::test]
async fn test_create_then_fetch() {
    let (_gateway, _bridge, coordinator) = setup();

    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();
    assert_eq!(job.status, JobStatus::Open);
    assert!(!job.id.is_empty());

    let fetched = coordinator
        .fetch(JobFilter {
            customer_id: Some("c1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(fetched.iter().any(|fetched_job| fetched_job.id == job.id));
}

#[tokio::test]
async fn test_create_validation_rejected_before_gateway() {
    let (gateway, bridge, coordinator) = setup();

    let err = coordinator
        .create(JobDraft {
            customer_id: "c1".to_string(),
            category: String::new(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation { .. }));
    assert_eq!(gateway.calls(), 0);
    // No settlement happened, so the bridge stays silent
    assert!(bridge.events().is_empty());
}

#[tokio::test]
async fn test_bid_validation_rejected_before_gateway() {
    let (gateway, _bridge, coordinator) = setup();
    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();
    let calls_before = gateway.calls();

    let err = coordinator.bid(&job.id, bid_draft(-5.0)).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation { .. }));
    assert_eq!(gateway.calls(), calls_before);
    assert_eq!(coordinator.store().bid_count(&job.id).await, 0);
}

#[tokio::test]
async fn test_first_bid_transitions_open_to_bidding() {
    let (_gateway, _bridge, coordinator) = setup();
    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();

    let settlement = coordinator.bid(&job.id, bid_draft(120.0)).await.unwrap();
    let bid = settlement.applied().expect("bid should be applied");
    assert_eq!(bid.amount, 120.0);

    let stored = coordinator.store().job(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Bidding);
    assert_eq!(coordinator.store().bid_count(&job.id).await, 1);

    // A second bid appends without a further transition
    coordinator.bid(&job.id, bid_draft(110.0)).await.unwrap();
    let stored = coordinator.store().job(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Bidding);
    assert_eq!(coordinator.store().bid_count(&job.id).await, 2);
}

#[tokio::test]
async fn test_failed_bid_write_leaves_status_and_ledger_unchanged() {
    let (gateway, bridge, coordinator) = setup();
    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();

    gateway.fail_next_insert_bid();
    let err = coordinator.bid(&job.id, bid_draft(90.0)).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Gateway(_)));

    let stored = coordinator.store().job(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Open);
    assert_eq!(coordinator.store().bid_count(&job.id).await, 0);
    assert!(bridge.events().contains(&(OperationKind::Bid, false)));
}

#[tokio::test]
async fn test_bid_on_unknown_job_rejected_locally() {
    let (gateway, _bridge, coordinator) = setup();
    let calls_before = gateway.calls();

    let err = coordinator.bid("ghost", bid_draft(50.0)).await.unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Store(StoreError::UnknownJob { .. })
    ));
    assert_eq!(gateway.calls(), calls_before);
}

#[tokio::test]
async fn test_stale_update_does_not_resurrect_removed_job() {
    let (gateway, _bridge, coordinator) = setup();
    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();

    let (entered, release) = gateway.gate_next_patch();
    let slow_update = tokio::spawn({
        let coordinator = coordinator.clone();
        let job_id = job.id.clone();
        async move {
            let mut patch = JobPatch::new();
            patch.insert("title".to_string(), serde_json::json!("Updated title"));
            coordinator.update(&job_id, patch).await
        }
    });

    // Wait until the patch has read the row, then let the remove win the race
    entered.notified().await;
    coordinator.remove(&job.id).await.unwrap();
    release.notify_one();

    let settlement = slow_update.await.unwrap().unwrap();
    assert_eq!(settlement, Settlement::Superseded);
    assert!(coordinator.store().job(&job.id).await.is_none());
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let (_gateway, _bridge, coordinator) = setup();
    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();

    coordinator.remove(&job.id).await.unwrap();
    coordinator.remove(&job.id).await.unwrap();
    assert_eq!(coordinator.store().jobs_count().await, 0);
}

#[tokio::test]
async fn test_invalid_transition_rejected() {
    let (_gateway, _bridge, coordinator) = setup();
    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();

    let err = coordinator
        .transition_status(&job.id, JobStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Store(StoreError::InvalidTransition { .. })
    ));
    let stored = coordinator.store().job(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Open);
}

#[tokio::test]
async fn test_completed_job_rejects_reopening() {
    let (_gateway, _bridge, coordinator) = setup();
    let job = coordinator.create(draft("c1", "brakes")).await.unwrap();

    coordinator.bid(&job.id, bid_draft(100.0)).await.unwrap();
    coordinator
        .transition_status(&job.id, JobStatus::Assigned)
        .await
        .unwrap();
    coordinator
        .transition_status(&job.id, JobStatus::InProgress)
        .await
        .unwrap();
    let completed = coordinator
        .transition_status(&job.id, JobStatus::Completed)
        .await
        .unwrap();
    assert!(completed.completed_at.is_some());

    let err = coordinator
        .transition_status(&job.id, JobStatus::Open)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Store(StoreError::InvalidTransition { .. })
    ));
    let stored = coordinator.store().job(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.completed_at, completed.completed_at);
}

#[tokio::test]
async fn test_unavailable_gateway_degrades_fetch_to_empty() {
    let (gateway, _bridge, coordinator) = setup();
    coordinator.create(draft("c1", "brakes")).await.unwrap();
    assert_eq!(coordinator.store().jobs_count().await, 1);

    gateway.set_unavailable(true);
    let jobs = coordinator.fetch(JobFilter::any()).await.unwrap();
    assert!(jobs.is_empty());
    assert_eq!(coordinator.store().jobs_count().await, 0);
}

#[tokio::test]
async fn test_unavailable_gateway_propagates_for_mutations() {
    let (gateway, _bridge, coordinator) = setup();
    gateway.set_unavailable(true);

    let err = coordinator.create(draft("c1", "brakes")).await.unwrap_err();
    match err {
        CoordinatorError::Gateway(gateway_err) => assert!(gateway_err.is_unavailable()),
        other => panic!("expected gateway error, got {other}"),
    }
}

#[tokio::test]
async fn test_update_divergence_surfaces_unknown_job() {
    let (gateway, _bridge, coordinator) = setup();
    gateway.seed_job("remote-only", "c9").await;

    let mut patch = JobPatch::new();
    patch.insert("title".to_string(), serde_json::json!("New"));
    let err = coordinator.update("remote-only", patch).await.unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Store(StoreError::UnknownJob { .. })
    ));
}

#[tokio::test]
async fn test_empty_patch_rejected() {
    let (gateway, _bridge, coordinator) = setup();
    let err = coordinator.update("any", JobPatch::new()).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation { .. }));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_tracker_phases_are_isolated_per_kind() {
    let (gateway, _bridge, coordinator) = setup();

    gateway.set_unavailable(true);
    coordinator.create(draft("c1", "brakes")).await.unwrap_err();
    gateway.set_unavailable(false);
    coordinator.fetch(JobFilter::any()).await.unwrap();

    let tracker = coordinator.tracker();
    assert_eq!(
        tracker.phase(OperationKind::Fetch).await,
        OperationPhase::Fulfilled
    );
    assert!(tracker.last_error(OperationKind::Create).await.is_some());
}

#[tokio::test]
async fn test_buffered_bid_drained_by_fetch() {
    let (gateway, _bridge, coordinator) = setup_with_config(CoordinatorConfig {
        bid_policy: BidPolicy::Buffer,
        fetch_limit: None,
    });
    gateway.seed_job("remote-only", "c9").await;

    // Job exists remotely but has not been fetched yet; the bid is parked
    let settlement = coordinator
        .bid("remote-only", bid_draft(75.0))
        .await
        .unwrap();
    assert!(settlement.applied().is_some());
    assert_eq!(coordinator.store().bid_count("remote-only").await, 0);

    // The remote copy arrives embedded; the parked duplicate is not re-added
    coordinator.fetch(JobFilter::any()).await.unwrap();
    assert_eq!(coordinator.store().bid_count("remote-only").await, 1);
}

#[tokio::test]
async fn test_fetch_limit_truncates() {
    let (gateway, _bridge, coordinator) = setup_with_config(CoordinatorConfig {
        bid_policy: BidPolicy::Reject,
        fetch_limit: Some(1),
    });
    gateway.seed_job("a", "c1").await;
    gateway.seed_job("b", "c1").await;

    let jobs = coordinator.fetch(JobFilter::any()).await.unwrap();
    assert_eq!(jobs.len(), 1);
}

#[tokio::test]
async fn test_reset_clears_store_and_phases() {
    let (_gateway, _bridge, coordinator) = setup();
    coordinator.create(draft("c1", "brakes")).await.unwrap();

    coordinator.reset().await;
    assert_eq!(coordinator.store().jobs_count().await, 0);
    assert_eq!(
        coordinator.tracker().phase(OperationKind::Create).await,
        OperationPhase::Idle
    );
}

#[tokio::test]
async fn test_bridge_receives_every_settlement() {
    let (gateway, bridge, coordinator) = setup();
    coordinator.create(draft("c1", "brakes")).await.unwrap();
    coordinator.fetch(JobFilter::any()).await.unwrap();
    gateway.set_unavailable(true);
    coordinator.create(draft("c2", "tires")).await.unwrap_err();

    let events = bridge.events();
    assert_eq!(
        events,
        vec![
            (OperationKind::Create, true),
            (OperationKind::Fetch, true),
            (OperationKind::Create, false),
        ]
    );
}
