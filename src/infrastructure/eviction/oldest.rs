//! Evict-oldest adapter.

use crate::application::ports::{EvictionCandidate, EvictionPolicy};

/// Evicts the candidate whose window started longest ago.
///
/// The store hands over a bounded sample of entries, not the whole map, so
/// the victim is the oldest among that sample. This is the default capacity
/// policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestEviction;

impl OldestEviction {
    /// Create the policy.
    pub fn new() -> Self {
        Self
    }
}

impl<K> EvictionPolicy<K> for OldestEviction
where
    K: Clone,
{
    fn select_victim(&self, candidates: &[EvictionCandidate<K>]) -> Option<K> {
        candidates
            .iter()
            .min_by_key(|candidate| candidate.last_seen)
            .map(|candidate| candidate.key.clone())
    }
}
