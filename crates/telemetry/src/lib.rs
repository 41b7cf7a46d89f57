//! Internal telemetry for the metric pipeline.
//!
//! Structured logging setup, process-wide counters for the publish and
//! provisioning paths, and component health flags.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
