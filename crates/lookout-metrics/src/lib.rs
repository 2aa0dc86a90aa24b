//! Lookout Metrics - bounded, insertion-ordered metric storage.
//!
//! The [`MetricsBuffer`] is the engine's only metric store: a fixed-capacity
//! ring that evicts the oldest sample when full. Rules evaluate against a
//! snapshot of it (the *metrics window*).

pub mod buffer;

pub use buffer::{MetricsBuffer, DEFAULT_CAPACITY};
