//! Bucket key computation.
//!
//! A bucket key is the map key of the dedup store. Each strategy derives it
//! from a subset of the `DedupKey` fields, scoped by the strategy name so two
//! strategies sharing one store never collide on the same bucket.

use crate::domain::key::{DedupKey, KeyField};
use ahash::AHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A strategy-derived digest of a subset of a `DedupKey`.
///
/// Keys built from identical scope and field values are equal; changing any
/// selected field value produces a different bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey(u64);

impl BucketKey {
    /// Compute a bucket key from a scope and an ordered list of field values.
    ///
    /// # Performance
    /// Uses the fast ahash algorithm; no allocations.
    pub fn new<'a>(scope: &str, parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = AHasher::default();

        scope.hash(&mut hasher);

        // `str` hashing is prefix-free, so ("ab", "c") and ("a", "bc") differ
        for part in parts {
            part.hash(&mut hasher);
        }

        BucketKey(hasher.finish())
    }

    /// Compute a bucket key over the selected fields of a dedup key.
    pub fn from_fields(scope: &str, key: &DedupKey, fields: &[KeyField]) -> Self {
        Self::new(scope, fields.iter().map(|field| key.field(*field)))
    }

    /// Get the raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
