//! Per-bucket dedup state and the record/compare rule applied to it.

use crate::domain::fingerprint::Fingerprint;
use std::time::{Duration, Instant};

// Roughly 30 years, representable on every supported platform
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Outcome of observing one occurrence against a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No live entry existed; a fresh one was recorded.
    First,
    /// A live entry existed with a different fingerprint; it was replaced.
    Changed,
    /// A live entry matched; its occurrence count was incremented.
    Repeat {
        /// Occurrences in the current window, including this one
        occurrences: u64,
    },
    /// The store was full and refused to track the bucket; nothing recorded.
    Untracked,
}

impl Observation {
    /// Whether the occurrence should create a new observation record.
    ///
    /// Everything except `Repeat` creates: an untracked bucket cannot be
    /// proven a duplicate.
    pub fn is_new(&self) -> bool {
        !matches!(self, Observation::Repeat { .. })
    }
}

/// Last-seen state of one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    /// Fingerprint recorded by the last creating occurrence
    pub fingerprint: Option<Fingerprint>,
    /// When the last creating occurrence was recorded
    pub last_seen: Instant,
    /// Window in force when the entry was recorded
    pub window: Duration,
    /// Occurrences seen in the current window
    pub occurrences: u64,
}

impl BucketEntry {
    /// Create an entry for a first occurrence.
    pub fn new(fingerprint: Option<Fingerprint>, now: Instant, window: Duration) -> Self {
        Self {
            fingerprint,
            last_seen: now,
            window,
            occurrences: 1,
        }
    }

    /// Whether the entry's window has elapsed at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) >= self.window
    }

    /// Instant at which the entry expires.
    ///
    /// Saturates to a far-future instant when the window does not fit in an
    /// `Instant`.
    pub fn expires_at(&self) -> Instant {
        self.last_seen
            .checked_add(self.window)
            .or_else(|| self.last_seen.checked_add(FAR_FUTURE))
            .unwrap_or(self.last_seen)
    }

    /// Apply one occurrence to this entry.
    ///
    /// An expired entry is restarted as if it were absent. A live entry is
    /// replaced when `fingerprint` is given and differs from the stored one,
    /// and counted as a repeat otherwise. Repeats do not move `last_seen`, so
    /// the window stays anchored at the occurrence that created the record.
    pub fn observe(
        &mut self,
        fingerprint: Option<&Fingerprint>,
        now: Instant,
        window: Duration,
    ) -> Observation {
        if self.is_expired(now) {
            *self = BucketEntry::new(fingerprint.cloned(), now, window);
            return Observation::First;
        }

        if let Some(fp) = fingerprint {
            if self.fingerprint.as_ref() != Some(fp) {
                *self = BucketEntry::new(Some(fp.clone()), now, window);
                return Observation::Changed;
            }
        }

        self.occurrences = self.occurrences.saturating_add(1);
        Observation::Repeat {
            occurrences: self.occurrences,
        }
    }
}
