//! Reject-new adapter.

use crate::application::ports::{EvictionCandidate, EvictionPolicy};

/// Never evicts live entries; new buckets are refused at capacity.
///
/// Refused occurrences are reported as untracked and allowed to create, so a
/// full store degrades to "no dedup" for new buckets rather than to
/// suppressing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectNewEviction;

impl RejectNewEviction {
    /// Create the policy.
    pub fn new() -> Self {
        Self
    }
}

impl<K> EvictionPolicy<K> for RejectNewEviction
where
    K: Clone,
{
    fn select_victim(&self, _candidates: &[EvictionCandidate<K>]) -> Option<K> {
        None
    }
}
