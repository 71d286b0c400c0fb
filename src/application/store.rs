//! Bounded, time-windowed bucket store.
//!
//! The store is the only mutable state of the dedup engine. It maps bucket
//! keys to their last-seen state and enforces the capacity bound.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, EvictionCandidate, EvictionPolicy};
use crate::domain::{
    bucket::BucketKey,
    entry::{BucketEntry, Observation},
    fingerprint::Fingerprint,
};
use crate::infrastructure::storage::ShardedStorage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Number of entries offered to the eviction policy per eviction round.
pub const EVICTION_SAMPLE_SIZE: usize = 64;

/// Upper bound on eviction rounds for a single insert.
const MAX_EVICTION_ROUNDS: usize = 16;

/// Default minimum gap between two full expiry passes.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(1);

/// Concurrent map from bucket key to last-seen state.
#[derive(Debug)]
pub struct BucketStore {
    storage: ShardedStorage<BucketKey, BucketEntry>,
    clock: Arc<dyn Clock>,
    eviction: Arc<dyn EvictionPolicy<BucketKey>>,
    metrics: Metrics,
    max_size: usize,
    purge_interval: Duration,
    last_purge: Mutex<Option<Instant>>,
    purge_passes: AtomicU64,
}

impl BucketStore {
    /// Create an empty store.
    pub fn new(
        clock: Arc<dyn Clock>,
        eviction: Arc<dyn EvictionPolicy<BucketKey>>,
        metrics: Metrics,
        max_size: usize,
    ) -> Self {
        Self {
            storage: ShardedStorage::with_capacity(max_size.min(4096)),
            clock,
            eviction,
            metrics,
            max_size,
            purge_interval: DEFAULT_PURGE_INTERVAL,
            last_purge: Mutex::new(None),
            purge_passes: AtomicU64::new(0),
        }
    }

    /// Set the minimum gap between two full expiry passes.
    ///
    /// At capacity, a full pass over the map runs at most once per interval;
    /// in between, only sampled entries that have expired are removed.
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Observe one occurrence for `bucket`.
    ///
    /// Atomic per bucket: concurrent callers observing the same fresh bucket
    /// see exactly one `First`.
    pub fn observe(
        &self,
        bucket: BucketKey,
        window: Duration,
        fingerprint: Option<&Fingerprint>,
    ) -> Observation {
        let now = self.clock.now();

        if !self.storage.contains_key(&bucket) && !self.make_room(now) {
            self.metrics.record_rejected();
            self.metrics.record_created();
            tracing::warn!(
                bucket = %bucket,
                entries = self.storage.len(),
                max_size = self.max_size,
                "Dedup store full, occurrence left untracked"
            );
            return Observation::Untracked;
        }

        let observation = self.storage.upsert(
            bucket,
            |entry| entry.observe(fingerprint, now, window),
            || {
                let entry = BucketEntry::new(fingerprint.cloned(), now, window);
                (entry, Observation::First)
            },
        );

        match observation {
            Observation::Repeat { .. } => self.metrics.record_suppressed(),
            _ => self.metrics.record_created(),
        }

        observation
    }

    /// Remove every entry whose window has elapsed.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(self.clock.now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        *self
            .last_purge
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(now);
        self.purge_passes.fetch_add(1, Ordering::Relaxed);

        let mut removed = 0usize;
        self.storage.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            self.metrics.record_expired(removed as u64);
        }
        removed
    }

    /// Whether a full expiry pass may run at `now`.
    fn purge_due(&self, now: Instant) -> bool {
        let last = *self
            .last_purge
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match last {
            Some(at) => now.saturating_duration_since(at) >= self.purge_interval,
            None => true,
        }
    }

    /// Remove the sampled candidates that have expired at `now`.
    fn purge_sampled(&self, candidates: &[EvictionCandidate<BucketKey>], now: Instant) -> usize {
        let mut removed = 0usize;
        for candidate in candidates.iter().filter(|c| c.expires_at <= now) {
            if self
                .storage
                .remove_if(&candidate.key, |entry| entry.is_expired(now))
                .is_some()
            {
                removed += 1;
            }
        }

        if removed > 0 {
            self.metrics.record_expired(removed as u64);
        }
        removed
    }

    /// Ensure there is room for one more bucket.
    ///
    /// Expired entries go first; live entries are then evicted as the policy
    /// chooses among a sample of [`EVICTION_SAMPLE_SIZE`] entries. Returns
    /// false when the policy declines to free a slot.
    fn make_room(&self, now: Instant) -> bool {
        if !self.over_capacity() {
            return true;
        }

        if self.purge_due(now) {
            let expired = self.purge_expired_at(now);
            if expired > 0 {
                tracing::debug!(expired, "Purged expired entries at capacity");
            }
        }

        for _ in 0..MAX_EVICTION_ROUNDS {
            if !self.over_capacity() {
                return true;
            }

            let candidates = self.storage.sample(EVICTION_SAMPLE_SIZE, |key, entry| {
                EvictionCandidate {
                    key: *key,
                    last_seen: entry.last_seen,
                    expires_at: entry.expires_at(),
                }
            });

            if self.purge_sampled(&candidates, now) > 0 {
                continue;
            }

            let Some(victim) = self.eviction.select_victim(&candidates) else {
                return false;
            };
            let sampled_at = candidates
                .iter()
                .find(|c| c.key == victim)
                .map(|c| c.last_seen);

            // Skip the victim if another caller restarted it after sampling
            let removed = self.storage.remove_if(&victim, |entry| {
                sampled_at.map_or(true, |last_seen| entry.last_seen <= last_seen)
            });
            if removed.is_some() {
                self.metrics.record_eviction();
                tracing::debug!(bucket = %victim, "Evicted live entry at capacity");
            }
        }

        !self.over_capacity()
    }

    fn over_capacity(&self) -> bool {
        self.eviction.should_evict(self.storage.len(), self.max_size)
    }

    /// Read the state of a bucket, if tracked.
    pub fn entry(&self, bucket: &BucketKey) -> Option<BucketEntry> {
        self.storage.read(bucket, BucketEntry::clone)
    }

    /// Forget a single bucket.
    pub fn forget(&self, bucket: &BucketKey) -> bool {
        self.storage.remove(bucket).is_some()
    }

    /// Get the number of tracked buckets.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if no bucket is tracked.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop all tracked buckets.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Get the capacity bound.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the metrics tracker.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Number of full expiry passes run so far.
    pub fn purge_passes(&self) -> u64 {
        self.purge_passes.load(Ordering::Relaxed)
    }
}
