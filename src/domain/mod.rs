//! Domain layer - pure business logic with no runtime dependencies.
//!
//! This layer contains the core concepts of the dedup engine:
//! - Dedup keys and their fields
//! - Strategy-scoped bucket keys
//! - Content fingerprints
//! - Per-bucket state and the record/compare rule
//!
//! All types in this layer are pure and easily testable.

pub mod bucket;
pub mod entry;
pub mod fingerprint;
pub mod key;
