//! Evict-nearest-to-expiry adapter.

use crate::application::ports::{EvictionCandidate, EvictionPolicy};

/// Evicts the candidate whose window ends soonest among the sampled entries.
///
/// Differs from [`OldestEviction`](super::OldestEviction) when strategies with
/// different windows share one store: a short-window bucket recorded recently
/// may still expire before a long-window bucket recorded earlier.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestExpiryEviction;

impl NearestExpiryEviction {
    /// Create the policy.
    pub fn new() -> Self {
        Self
    }
}

impl<K> EvictionPolicy<K> for NearestExpiryEviction
where
    K: Clone,
{
    fn select_victim(&self, candidates: &[EvictionCandidate<K>]) -> Option<K> {
        candidates
            .iter()
            .min_by_key(|candidate| (candidate.expires_at, candidate.last_seen))
            .map(|candidate| candidate.key.clone())
    }
}
