//! Job types and the status state machine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Bid;

/// Job status lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Posted, no bids yet
    Open,
    /// At least one bid received
    Bidding,
    /// Customer accepted a bid
    Assigned,
    /// Work has begun
    InProgress,
    /// Work finished (terminal)
    Completed,
    /// Under dispute
    Disputed,
    /// Cancelled by either party (terminal)
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Bidding => write!(f, "bidding"),
            Self::Assigned => write!(f, "assigned"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Disputed => write!(f, "disputed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl JobStatus {
    /// Terminal states admit no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the edge `self -> next` is permitted by the lifecycle.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Self::Open, Self::Bidding) => true,
            (Self::Bidding, Self::Assigned) => true,
            (Self::Assigned, Self::InProgress) => true,
            (Self::InProgress, Self::Completed) => true,
            // Any active state can be disputed
            (Self::Open | Self::Bidding | Self::Assigned | Self::InProgress, Self::Disputed) => {
                true
            }
            // Any non-terminal state (disputes included) can be cancelled
            (_, Self::Cancelled) => true,
            _ => false,
        }
    }

    /// Statuses in which a mechanic has been attached to the job.
    pub fn has_mechanic(&self) -> bool {
        matches!(
            self,
            Self::Assigned | Self::InProgress | Self::Completed | Self::Disputed
        )
    }
}

/// A customer's posted service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Remote-assigned identifier, immutable after creation
    pub id: String,

    /// Posting customer
    pub customer_id: String,

    /// Assigned mechanic, absent until a bid is accepted
    pub mechanic_id: Option<String>,

    /// Lifecycle status
    pub status: JobStatus,

    /// Service category (e.g. "brakes"), opaque to the core
    pub category: String,

    /// Short title
    pub title: String,

    /// Free-form description
    pub description: Option<String>,

    /// Photo URLs
    #[serde(default)]
    pub photos: Vec<String>,

    /// Creation timestamp (epoch milliseconds)
    pub created_at: u64,

    /// Last mutation timestamp (epoch milliseconds)
    pub updated_at: u64,

    /// Set exactly once, when the status enters `Completed`
    pub completed_at: Option<u64>,
}

impl Job {
    /// Check the entity-level invariants.
    ///
    /// Returns a human-readable description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("job id must not be empty".to_string());
        }
        if self.customer_id.is_empty() {
            return Err("job customer_id must not be empty".to_string());
        }
        match (self.status, self.completed_at) {
            (JobStatus::Completed, None) => {
                return Err("completed job is missing completed_at".to_string());
            }
            (status, Some(_)) if status != JobStatus::Completed => {
                return Err(format!("completed_at set on {} job", status));
            }
            _ => {}
        }
        if self.mechanic_id.is_some() && !self.status.has_mechanic() {
            return Err(format!("mechanic_id set on {} job", self.status));
        }
        Ok(())
    }
}

/// A job as returned by gateway queries: the entity plus its denormalized
/// bid ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job: Job,
    #[serde(default)]
    pub bids: Vec<Bid>,
}

/// Input for creating a job. The remote assigns id and the core stamps the
/// timestamps; callers only supply descriptive fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDraft {
    pub customer_id: String,
    pub category: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl JobDraft {
    /// Check the mandatory fields before any gateway dispatch.
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_id.is_empty() {
            return Err("job draft requires customer_id".to_string());
        }
        if self.category.is_empty() {
            return Err("job draft requires category".to_string());
        }
        Ok(())
    }
}

/// Partial update payload, opaque to the core beyond being non-empty.
pub type JobPatch = serde_json::Map<String, serde_json::Value>;
