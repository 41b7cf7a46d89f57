//! Shared harness for the metric pipeline integration tests.

pub mod containers;
pub mod fixtures;
pub mod mocks;
pub mod setup;
