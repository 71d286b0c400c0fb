//! Mock implementations for testing.
//!
//! Test doubles for infrastructure adapters, so time-dependent dedup
//! behavior can be exercised without sleeping.

pub mod clock;

pub use clock::MockClock;
