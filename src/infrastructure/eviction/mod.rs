//! Capacity eviction adapters.
//!
//! Each adapter implements the `EvictionPolicy` port. `EvictionStrategy` is
//! the configuration-facing enum that selects one of them.

pub mod nearest_expiry;
pub mod oldest;
pub mod reject;

pub use nearest_expiry::NearestExpiryEviction;
pub use oldest::OldestEviction;
pub use reject::RejectNewEviction;

use crate::application::ports::EvictionPolicy;
use crate::domain::bucket::BucketKey;
use serde::Deserialize;
use std::sync::Arc;

/// What the store does when a new bucket arrives at capacity.
///
/// Expired entries are always purged first. The strategy then picks among a
/// sample of at most [`EVICTION_SAMPLE_SIZE`](crate::application::store::EVICTION_SAMPLE_SIZE)
/// live entries, so `Oldest` and `NearestExpiry` are approximate once the
/// store holds more than that.
#[derive(Clone, Default)]
pub enum EvictionStrategy {
    /// Evict the sampled entry whose window started longest ago (default).
    #[default]
    Oldest,
    /// Evict the sampled entry whose window ends soonest.
    NearestExpiry,
    /// Keep all live entries and leave the new bucket untracked.
    RejectNew,
    /// A caller-supplied policy.
    Custom(Arc<dyn EvictionPolicy<BucketKey>>),
}

impl EvictionStrategy {
    /// Build the policy adapter for this strategy.
    pub fn into_policy(self) -> Arc<dyn EvictionPolicy<BucketKey>> {
        match self {
            EvictionStrategy::Oldest => Arc::new(OldestEviction::new()),
            EvictionStrategy::NearestExpiry => Arc::new(NearestExpiryEviction::new()),
            EvictionStrategy::RejectNew => Arc::new(RejectNewEviction::new()),
            EvictionStrategy::Custom(policy) => policy,
        }
    }

    /// Configuration name of the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            EvictionStrategy::Oldest => "oldest",
            EvictionStrategy::NearestExpiry => "nearest-expiry",
            EvictionStrategy::RejectNew => "reject-new",
            EvictionStrategy::Custom(_) => "custom",
        }
    }
}

impl std::fmt::Debug for EvictionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionStrategy::Custom(policy) => f.debug_tuple("Custom").field(policy).finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl<'de> Deserialize<'de> for EvictionStrategy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "" | "oldest" => Ok(EvictionStrategy::Oldest),
            "nearest-expiry" => Ok(EvictionStrategy::NearestExpiry),
            "reject-new" => Ok(EvictionStrategy::RejectNew),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["oldest", "nearest-expiry", "reject-new"],
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(EvictionStrategy::default().name(), "oldest");
        assert_eq!(EvictionStrategy::NearestExpiry.name(), "nearest-expiry");
        assert_eq!(EvictionStrategy::RejectNew.name(), "reject-new");
        assert_eq!(
            EvictionStrategy::Custom(Arc::new(OldestEviction::new())).name(),
            "custom"
        );
    }

    #[test]
    fn test_deserialize() {
        let parsed: EvictionStrategy = serde_json::from_str("\"nearest-expiry\"").unwrap();
        assert_eq!(parsed.name(), "nearest-expiry");

        let parsed: EvictionStrategy = serde_json::from_str("\"\"").unwrap();
        assert_eq!(parsed.name(), "oldest");

        assert!(serde_json::from_str::<EvictionStrategy>("\"lru\"").is_err());
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", EvictionStrategy::RejectNew), "reject-new");
        let custom = EvictionStrategy::Custom(Arc::new(RejectNewEviction::new()));
        assert!(format!("{:?}", custom).starts_with("Custom("));
    }
}
