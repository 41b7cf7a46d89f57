//! Redpanda plumbing for the metric pipeline: startup topic provisioning and
//! the queued publish path.

pub mod admin;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod health;
pub mod partitioner;
pub mod producer;
pub mod publisher;
pub mod topics;

pub use admin::*;
pub use bootstrap::*;
pub use config::*;
pub use producer::*;
pub use publisher::*;
pub use topics::*;
