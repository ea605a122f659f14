//! Bid types

use serde::{Deserialize, Serialize};

/// A mechanic's priced offer against a job. Never mutated after creation;
/// ledgers only append or remove bids wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Remote-assigned identifier
    pub id: String,

    /// Job this bid targets
    pub job_id: String,

    /// Bidding mechanic
    pub mechanic_id: String,

    /// Offered amount, strictly positive
    pub amount: f64,

    /// Optional note to the customer
    pub message: Option<String>,

    /// Creation timestamp (epoch milliseconds)
    pub created_at: u64,
}

/// Input for placing a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidDraft {
    pub mechanic_id: String,
    pub amount: f64,
    pub message: Option<String>,
}

impl BidDraft {
    /// Check the draft before any gateway dispatch.
    pub fn validate(&self) -> Result<(), String> {
        if self.mechanic_id.is_empty() {
            return Err("bid draft requires mechanic_id".to_string());
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(format!("bid amount must be positive, got {}", self.amount));
        }
        Ok(())
    }
}
