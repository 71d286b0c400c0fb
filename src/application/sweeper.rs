//! Background expiry sweep.
//!
//! Periodically removes expired buckets so memory does not grow between
//! lookups. The sweep runs as a tokio task owned through a [`SweepHandle`].

use crate::application::store::BucketStore;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Longest period between two sweep passes when none is configured.
pub const MAX_DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Error returned when the sweep task fails to shut down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// The sweep task panicked or was cancelled
    #[error("sweep task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a running sweep task.
///
/// Dropping the handle also ends the task, since the task exits as soon as
/// its stop channel closes.
#[derive(Debug)]
pub struct SweepHandle {
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SweepHandle {
    /// Signal the sweep to stop. Idempotent.
    pub fn stop(&self) {
        let was_stopped = self.stop_tx.send_replace(true);
        if !was_stopped {
            tracing::debug!("Dedup sweep stop requested");
        }
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Stop the sweep and wait for the task to finish.
    ///
    /// Returns immediately if the task has already been awaited.
    ///
    /// # Errors
    /// Returns `ShutdownError::Join` if the task panicked.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        self.stop();

        // Take the handle while holding the lock, then release it before awaiting
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            task.await?;
        }
        Ok(())
    }
}

/// Start the sweep for `store` on the given runtime.
///
/// The first pass runs one `period` after start.
pub fn start(
    store: Arc<BucketStore>,
    period: Duration,
    runtime: &tokio::runtime::Handle,
) -> SweepHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = runtime.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval_ms = period.as_millis() as u64, "Dedup sweep started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.purge_expired();
                    tracing::debug!(
                        removed,
                        remaining = store.len(),
                        "Dedup sweep pass complete"
                    );
                }
                changed = stop_rx.changed() => {
                    // A closed channel means the owner is gone
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Dedup sweep stopped");
    });

    SweepHandle {
        stop_tx,
        task: Mutex::new(Some(task)),
    }
}

/// Default sweep period for a dedup window.
pub fn default_interval(window: Duration) -> Duration {
    window.min(MAX_DEFAULT_SWEEP_INTERVAL)
}
