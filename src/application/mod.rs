//! Application layer - orchestration of domain logic.
//!
//! This layer owns the runtime behavior of the dedup engine:
//! - Bucket store (bounded, time-windowed state)
//! - Deduper (the shared store plus its expiry sweep)
//! - Dedup strategies and the factory selecting them
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod config;
pub mod deduper;
pub mod metrics;
pub mod ports;
pub mod store;
pub mod strategy;
pub mod sweeper;
