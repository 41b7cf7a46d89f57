//! Core types for the metric-delta pipeline.
//!
//! Defines the closed catalogue of countable entities and their columns,
//! the `MetricDeltaEvent` wire contract, and the unified error type.

pub mod error;
pub mod event;
pub mod metric;

pub use error::{Error, ErrorClass, Result};
pub use event::*;
pub use metric::*;
