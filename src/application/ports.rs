//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use std::time::Instant;

/// Candidate entry for eviction consideration.
///
/// Values are cloned out of the concurrent map so no shard lock is held while
/// the policy decides.
#[derive(Debug, Clone)]
pub struct EvictionCandidate<K> {
    /// The key of the entry
    pub key: K,
    /// When the entry was last recorded
    pub last_seen: Instant,
    /// When the entry's window ends
    pub expires_at: Instant,
}

/// Port for capacity eviction decisions.
///
/// The store consults the policy when a new bucket must be inserted while the
/// store is at capacity. Expired entries are purged before the policy is
/// asked, so candidates are always live.
pub trait EvictionPolicy<K>: Send + Sync + Debug
where
    K: Clone,
{
    /// Select a victim from the given candidates.
    ///
    /// # Returns
    /// The key of the entry to evict, or `None` to refuse the new insert.
    fn select_victim(&self, candidates: &[EvictionCandidate<K>]) -> Option<K>;

    /// Check if eviction should be triggered before inserting a new entry.
    ///
    /// # Arguments
    /// * `current_entries` - Current number of entries in the store
    /// * `max_entries` - Configured capacity
    fn should_evict(&self, current_entries: usize, max_entries: usize) -> bool {
        current_entries >= max_entries
    }
}

/// Port for obtaining current time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}
