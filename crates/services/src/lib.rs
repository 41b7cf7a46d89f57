//! Metric services for the write paths.
//!
//! A write path finishes its primary change, then asks the matching service
//! for a counter delta. The delta is queued for the broker; the counter store
//! is updated later by an independent consumer.

pub mod registry;
pub mod service;

pub use registry::*;
pub use service::MetricService;
