//! Observability metrics for dedup decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking dedup statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Occurrences allowed to create an observation
    observations_created: AtomicU64,
    /// Occurrences suppressed as duplicates
    duplicates_suppressed: AtomicU64,
    /// Entries removed because their window elapsed
    entries_expired: AtomicU64,
    /// Live entries removed to make room at capacity
    entries_evicted: AtomicU64,
    /// New buckets the store refused to track at capacity
    inserts_rejected: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_created(&self) {
        self.inner
            .observations_created
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.inner
            .duplicates_suppressed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self, count: u64) {
        self.inner
            .entries_expired
            .fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.inner.entries_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.inserts_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the total number of occurrences allowed to create.
    pub fn observations_created(&self) -> u64 {
        self.inner.observations_created.load(Ordering::Relaxed)
    }

    /// Get the total number of suppressed duplicates.
    pub fn duplicates_suppressed(&self) -> u64 {
        self.inner.duplicates_suppressed.load(Ordering::Relaxed)
    }

    /// Get the total number of expired entries removed.
    pub fn entries_expired(&self) -> u64 {
        self.inner.entries_expired.load(Ordering::Relaxed)
    }

    /// Get the total number of live entries evicted at capacity.
    pub fn entries_evicted(&self) -> u64 {
        self.inner.entries_evicted.load(Ordering::Relaxed)
    }

    /// Get the total number of refused inserts.
    pub fn inserts_rejected(&self) -> u64 {
        self.inner.inserts_rejected.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            observations_created: self.observations_created(),
            duplicates_suppressed: self.duplicates_suppressed(),
            entries_expired: self.entries_expired(),
            entries_evicted: self.entries_evicted(),
            inserts_rejected: self.inserts_rejected(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.observations_created.store(0, Ordering::Relaxed);
        self.inner.duplicates_suppressed.store(0, Ordering::Relaxed);
        self.inner.entries_expired.store(0, Ordering::Relaxed);
        self.inner.entries_evicted.store(0, Ordering::Relaxed);
        self.inner.inserts_rejected.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Occurrences allowed to create an observation
    pub observations_created: u64,
    /// Occurrences suppressed as duplicates
    pub duplicates_suppressed: u64,
    /// Entries removed because their window elapsed
    pub entries_expired: u64,
    /// Live entries removed to make room at capacity
    pub entries_evicted: u64,
    /// New buckets the store refused to track at capacity
    pub inserts_rejected: u64,
}

impl MetricsSnapshot {
    /// Ratio of suppressed occurrences to all decisions (0.0 to 1.0).
    ///
    /// Returns 0.0 if no decisions have been made.
    pub fn suppression_rate(&self) -> f64 {
        let total = self.total_decisions();
        if total == 0 {
            0.0
        } else {
            self.duplicates_suppressed as f64 / total as f64
        }
    }

    /// Get the total number of decisions (created + suppressed).
    pub fn total_decisions(&self) -> u64 {
        self.observations_created
            .saturating_add(self.duplicates_suppressed)
    }
}
