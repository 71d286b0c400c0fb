//! The shared dedup store and its lifecycle.
//!
//! A `Deduper` owns a [`BucketStore`] and the background sweep that expires
//! its entries. It is shared by reference across every concurrent caller of
//! a dedup strategy.

use crate::application::metrics::Metrics;
use crate::application::ports::Clock;
use crate::application::store::BucketStore;
use crate::application::sweeper::{self, ShutdownError, SweepHandle};
use crate::domain::{bucket::BucketKey, entry::BucketEntry, entry::Observation, fingerprint::Fingerprint};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::eviction::EvictionStrategy;
use std::sync::Arc;
use std::time::Duration;

/// Default dedup window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default capacity bound.
pub const DEFAULT_MAX_SIZE: usize = 10_000;

/// Error returned when building a `Deduper` fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeduperError {
    /// The dedup window must be greater than zero
    #[error("dedup window must be greater than 0")]
    ZeroWindow,
    /// The capacity bound must be greater than zero
    #[error("max size must be greater than 0")]
    ZeroMaxSize,
    /// The sweep interval must be greater than zero
    #[error("sweep interval must be greater than 0")]
    ZeroSweepInterval,
    /// The expiry sweep needs a tokio runtime
    #[error("no tokio runtime available to run the expiry sweep")]
    NoRuntime,
}

/// Builder for constructing a `Deduper`.
#[derive(Debug)]
pub struct DeduperBuilder {
    window: Duration,
    max_size: usize,
    sweep_interval: Option<Duration>,
    eviction: EvictionStrategy,
    clock: Option<Arc<dyn Clock>>,
}

impl DeduperBuilder {
    /// Set the default dedup window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the maximum number of tracked buckets.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set how often the background sweep runs.
    ///
    /// Defaults to the window, capped at one minute.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Set what happens when a new bucket arrives at capacity.
    pub fn with_eviction_strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.eviction = strategy;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the deduper and start its sweep on the current tokio runtime.
    ///
    /// # Errors
    /// Returns `DeduperError` if a parameter is zero or no runtime is
    /// available.
    pub fn build(self) -> Result<Deduper, DeduperError> {
        if self.window.is_zero() {
            return Err(DeduperError::ZeroWindow);
        }
        if self.max_size == 0 {
            return Err(DeduperError::ZeroMaxSize);
        }
        let sweep_interval = self
            .sweep_interval
            .unwrap_or_else(|| sweeper::default_interval(self.window));
        if sweep_interval.is_zero() {
            return Err(DeduperError::ZeroSweepInterval);
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| DeduperError::NoRuntime)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let store = Arc::new(BucketStore::new(
            clock,
            self.eviction.clone().into_policy(),
            Metrics::new(),
            self.max_size,
        )
        .with_purge_interval(sweep_interval));
        let sweep = sweeper::start(Arc::clone(&store), sweep_interval, &runtime);

        tracing::debug!(
            window_secs = self.window.as_secs_f64(),
            max_size = self.max_size,
            sweep_interval_ms = sweep_interval.as_millis() as u64,
            eviction = self.eviction.name(),
            "Deduper created"
        );

        Ok(Deduper {
            store,
            sweep,
            window: self.window,
        })
    }
}

impl Default for DeduperBuilder {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_size: DEFAULT_MAX_SIZE,
            sweep_interval: None,
            eviction: EvictionStrategy::default(),
            clock: None,
        }
    }
}

/// Bounded, time-windowed dedup store shared by all strategy calls.
///
/// # Example
/// ```
/// use dedup_engine::{Deduper, DedupKey, DedupStrategy, FingerprintStrategy};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let deduper = Deduper::new(60, 1_000).unwrap();
/// let strategy = FingerprintStrategy::new();
///
/// let key = DedupKey::new("falco", "default", "Pod", "web-0", "Shell", "a1");
/// let content = json!({"source": "falco", "severity": "HIGH"});
/// let content = content.as_object().unwrap();
///
/// assert!(strategy.should_create(&deduper, &key, content));
/// assert!(!strategy.should_create(&deduper, &key, content));
///
/// deduper.shutdown().await.unwrap();
/// # }
/// ```
#[derive(Debug)]
pub struct Deduper {
    store: Arc<BucketStore>,
    sweep: SweepHandle,
    window: Duration,
}

impl Deduper {
    /// Create a deduper with a default window in seconds and a capacity bound.
    ///
    /// Must be called from within a tokio runtime; the expiry sweep starts
    /// immediately.
    ///
    /// # Errors
    /// Returns `DeduperError` if either parameter is zero or no runtime is
    /// available.
    pub fn new(window_seconds: u64, max_size: usize) -> Result<Self, DeduperError> {
        Self::builder()
            .with_window(Duration::from_secs(window_seconds))
            .with_max_size(max_size)
            .build()
    }

    /// Create a builder for configuring the deduper.
    ///
    /// Defaults:
    /// - Window: 60 seconds
    /// - Max size: 10,000 buckets
    /// - Sweep interval: the window, capped at 60 seconds
    /// - Eviction: oldest entry among a sample first
    pub fn builder() -> DeduperBuilder {
        DeduperBuilder::default()
    }

    /// Observe one occurrence in `bucket` under `window`.
    ///
    /// This is the lookup/record primitive the strategies build on. When
    /// `fingerprint` is given, a live entry with a different fingerprint
    /// counts as changed content rather than a repeat.
    pub fn observe(
        &self,
        bucket: BucketKey,
        window: Duration,
        fingerprint: Option<&Fingerprint>,
    ) -> Observation {
        self.store.observe(bucket, window, fingerprint)
    }

    /// Stop the background sweep. Idempotent.
    ///
    /// The store stays usable afterwards; expired entries are still treated
    /// as absent on lookup but are no longer removed automatically.
    pub fn stop(&self) {
        self.sweep.stop();
    }

    /// Stop the background sweep and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the sweep task panicked.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        self.sweep.shutdown().await
    }

    /// Whether the sweep has been asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.sweep.is_stopped()
    }

    /// Run one expiry pass now.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    /// Get the state tracked for a bucket, if any.
    pub fn entry(&self, bucket: &BucketKey) -> Option<BucketEntry> {
        self.store.entry(bucket)
    }

    /// Forget a single bucket, so its next occurrence is created.
    ///
    /// # Returns
    /// Whether the bucket was tracked.
    pub fn forget(&self, bucket: &BucketKey) -> bool {
        self.store.forget(bucket)
    }

    /// Get the default dedup window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get the capacity bound.
    pub fn max_size(&self) -> usize {
        self.store.max_size()
    }

    /// Get the number of tracked buckets.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if no bucket is tracked.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop all tracked buckets.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Get the metrics tracker.
    pub fn metrics(&self) -> &Metrics {
        self.store.metrics()
    }
}
