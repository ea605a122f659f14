use std::env;
use store::BidPolicy;
use tracing::warn;

/// Coordinator configuration, read from the environment.
///
/// Callers that embed the core load a `.env` via `dotenvy` before calling
/// [`CoordinatorConfig::from_env`].
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Policy for bids targeting jobs not present locally
    pub bid_policy: BidPolicy,
    /// Optional cap applied to fetch results
    pub fetch_limit: Option<usize>,
}

impl CoordinatorConfig {
    /// Read configuration from `MARKETPLACE_BID_POLICY` and
    /// `MARKETPLACE_FETCH_LIMIT`. Unset or unparseable values fall back to
    /// the defaults with a warning.
    pub fn from_env() -> Self {
        let bid_policy = match env::var("MARKETPLACE_BID_POLICY") {
            Ok(value) => match value.to_lowercase().as_str() {
                "buffer" => BidPolicy::Buffer,
                "reject" => BidPolicy::Reject,
                other => {
                    warn!("Unknown MARKETPLACE_BID_POLICY '{}', using reject", other);
                    BidPolicy::Reject
                }
            },
            Err(_) => BidPolicy::Reject,
        };

        let fetch_limit = env::var("MARKETPLACE_FETCH_LIMIT")
            .ok()
            .and_then(|value| match value.parse::<usize>() {
                Ok(limit) if limit > 0 => Some(limit),
                _ => {
                    warn!("Invalid MARKETPLACE_FETCH_LIMIT '{}', ignoring", value);
                    None
                }
            });

        Self {
            bid_policy,
            fetch_limit,
        }
    }
}
