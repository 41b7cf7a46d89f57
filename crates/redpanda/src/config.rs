//! Redpanda configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::topics::topic;

/// Broker connection and publishing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses (`host:port`)
    pub brokers: Vec<String>,
    /// Topic metric deltas are published to
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Compression type (none, gzip, snappy, lz4, zstd)
    #[serde(default = "default_compression")]
    pub compression: String,
    /// Upper bound on a single produce request, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// SASL username (Redpanda Cloud)
    #[serde(default)]
    pub sasl_username: Option<String>,
    /// SASL password (Redpanda Cloud)
    #[serde(default)]
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

fn default_topic() -> String {
    topic::METRIC_EVENTS.to_string()
}

fn default_compression() -> String {
    "lz4".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: default_topic(),
            compression: default_compression(),
            request_timeout_ms: default_request_timeout_ms(),
            sasl_username: None,
            sasl_password: None,
            publisher: PublisherConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// SASL credentials, if both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.sasl_username, &self.sasl_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

/// Outbound queue settings for the metric publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Bounded queue capacity between request handlers and the send worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long `publish` waits for queue space before giving up
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_enqueue_timeout_ms() -> u64 {
    50
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
        }
    }
}

impl PublisherConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

/// Startup provisioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Connection attempts before startup is aborted
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between connection attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound on one connection attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Timeout for the whole topic creation batch
    #[serde(default = "default_create_timeout_ms")]
    pub create_timeout_ms: u64,
    /// Declarative topic list
    #[serde(default = "default_topics_file")]
    pub topics_file: String,
    /// Brokers in the cluster; replication factors are clamped to this
    #[serde(default = "default_available_brokers")]
    pub available_brokers: usize,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_create_timeout_ms() -> u64 {
    10_000
}

fn default_topics_file() -> String {
    "config/topics.toml".to_string()
}

fn default_available_brokers() -> usize {
    1
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            create_timeout_ms: default_create_timeout_ms(),
            topics_file: default_topics_file(),
            available_brokers: default_available_brokers(),
        }
    }
}

impl AdminConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }
}
