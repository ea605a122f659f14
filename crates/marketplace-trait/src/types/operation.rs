//! Operation kinds tracked by the coordinator

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five logical operations the coordinator dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Fetch,
    Create,
    Update,
    Remove,
    Bid,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
            Self::Bid => write!(f, "bid"),
        }
    }
}

impl OperationKind {
    /// Precedence when settlements for the same job id race: a settlement is
    /// discarded if a higher-priority one already landed (remove > update >
    /// create). Kinds outside the ladder never supersede anything.
    pub fn settlement_priority(&self) -> u8 {
        match self {
            Self::Remove => 3,
            Self::Update => 2,
            Self::Create => 1,
            Self::Fetch | Self::Bid => 0,
        }
    }

    /// All kinds, for iteration in trackers and tests.
    pub const ALL: [OperationKind; 5] = [
        Self::Fetch,
        Self::Create,
        Self::Update,
        Self::Remove,
        Self::Bid,
    ];
}
