//! Query filter descriptor

use serde::{Deserialize, Serialize};

use crate::types::{Job, JobStatus};

/// Transient query descriptor; every field is optional and absent fields
/// match everything. Owned by the store, replaced or merged on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub customer_id: Option<String>,
    pub mechanic_id: Option<String>,
    pub category: Option<String>,
}

impl JobFilter {
    /// Filter with no constraints.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether a job satisfies every set field.
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }
        if let Some(customer_id) = &self.customer_id {
            if &job.customer_id != customer_id {
                return false;
            }
        }
        if let Some(mechanic_id) = &self.mechanic_id {
            if job.mechanic_id.as_ref() != Some(mechanic_id) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &job.category != category {
                return false;
            }
        }
        true
    }

    /// Overlay the set fields of `partial` onto this filter.
    pub fn merge(&mut self, partial: JobFilter) {
        if partial.status.is_some() {
            self.status = partial.status;
        }
        if partial.customer_id.is_some() {
            self.customer_id = partial.customer_id;
        }
        if partial.mechanic_id.is_some() {
            self.mechanic_id = partial.mechanic_id;
        }
        if partial.category.is_some() {
            self.category = partial.category;
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.customer_id.is_none()
            && self.mechanic_id.is_none()
            && self.category.is_none()
    }
}
