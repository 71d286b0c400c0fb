//! # dedup-engine
//!
//! Time-windowed event deduplication for detection pipelines.
//!
//! A [`Deduper`] is a small concurrent cache shared by every producer of
//! observation events. For each incoming event a [`DedupStrategy`] decides
//! whether it is a new occurrence that should be recorded, or a duplicate of
//! something already recorded within the current window.
//!
//! ## Quick Start
//!
//! ```rust
//! use dedup_engine::{get_strategy, Deduper, DedupKey, DedupStrategy, StrategyConfig};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 60 second window, at most 10k tracked buckets
//! let deduper = Deduper::new(60, 10_000)?;
//! let strategy = get_strategy(&StrategyConfig::default())?;
//!
//! let key = DedupKey::new("trivy", "prod", "Deployment", "api", "Vulnerability", "9f2c");
//! let content = json!({"source": "trivy", "severity": "HIGH", "rule": "CVE-2024-0001"});
//! let content = content.as_object().cloned().unwrap_or_default();
//!
//! assert!(strategy.should_create(&deduper, &key, &content));
//! assert!(!strategy.should_create(&deduper, &key, &content));
//!
//! deduper.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Strategies
//!
//! - **`fingerprint`** (default): buckets on source, namespace, kind, name
//!   and reason. Repeats with the same content fingerprint are suppressed;
//!   a change in the canonical content (severity, rule, details...) creates
//!   a new observation even within the window.
//! - **`event-stream`**: buckets on the full key including the message hash
//!   and ignores content. The window is capped at five minutes, and a warning
//!   is logged once per window when a stream reaches
//!   `max_events_per_window` occurrences.
//! - **`key`**: buckets on a configured subset of key fields and ignores
//!   everything else.
//!
//! ## Fingerprints
//!
//! A [`Fingerprint`] is a SHA-256 digest over the semantically meaningful
//! content fields. Volatile fields such as `timestamp`, `lastSeen`, `count`
//! or `resourceVersion` are stripped at every depth, so two reports of the
//! same finding produce the same fingerprint.
//!
//! ## Capacity and Expiry
//!
//! Entries expire when their window has elapsed. Expired entries are treated
//! as absent on lookup and removed by a background sweep running on the
//! current tokio runtime. When a new bucket arrives at `max_size`, expired
//! entries are purged first; then the configured [`EvictionStrategy`]
//! decides which live entry to drop, choosing among a bounded sample of
//! entries rather than scanning the whole store:
//!
//! ```rust
//! use dedup_engine::{Deduper, EvictionStrategy};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let deduper = Deduper::builder()
//!     .with_window(Duration::from_secs(120))
//!     .with_max_size(50_000)
//!     .with_sweep_interval(Duration::from_secs(15))
//!     .with_eviction_strategy(EvictionStrategy::NearestExpiry)
//!     .build()
//!     .unwrap();
//! # deduper.stop();
//! # }
//! ```
//!
//! With [`EvictionStrategy::RejectNew`] a full store keeps its live entries
//! and leaves the new bucket untracked; such events are always created.
//!
//! ## Configuration
//!
//! [`DedupSettings::from_env`] reads `DEDUP_WINDOW_SECONDS`,
//! `DEDUP_MAX_SIZE`, `DEDUP_SWEEP_INTERVAL_SECONDS`, `DEDUP_EVICTION`,
//! `DEDUP_STRATEGY`, `DEDUP_MAX_EVENTS_PER_WINDOW` and `DEDUP_FIELDS`.
//!
//! ## Observability
//!
//! Decisions are logged through `tracing`, and counted in [`Metrics`]:
//!
//! ```rust,no_run
//! # use dedup_engine::Deduper;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! # let deduper = Deduper::new(60, 100).unwrap();
//! let snapshot = deduper.metrics().snapshot();
//! println!("Created: {}", snapshot.observations_created);
//! println!("Suppressed: {}", snapshot.duplicates_suppressed);
//! println!("Suppression rate: {:.2}%", snapshot.suppression_rate() * 100.0);
//! # }
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    bucket::BucketKey,
    entry::{BucketEntry, Observation},
    fingerprint::{Content, Fingerprint},
    key::{DedupKey, KeyField, UnknownKeyField},
};

pub use application::{
    config::{ConfigError, DedupSettings},
    deduper::{Deduper, DeduperBuilder, DeduperError},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, EvictionCandidate, EvictionPolicy},
    strategy::{
        get_strategy, DedupStrategy, EventStreamStrategy, FingerprintStrategy,
        KeyBasedStrategy, Strategy, StrategyConfig, StrategyError,
    },
    sweeper::ShutdownError,
};

pub use infrastructure::{
    clock::SystemClock,
    eviction::{EvictionStrategy, NearestExpiryEviction, OldestEviction, RejectNewEviction},
};
