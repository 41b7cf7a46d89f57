//! Broker send path.
//!
//! `MessageSink` is the seam between the publisher worker and the broker.
//! `RedpandaSink` owns one long-lived rskafka client for the whole process.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use pipeline_core::{Error, Result};
use rskafka::client::{
    partition::{Compression, PartitionClient, UnknownTopicHandling},
    Client,
};
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::{health, metrics};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::client::{self, within};
use crate::config::RedpandaConfig;
use crate::partitioner::partition_for;

/// A serialized record ready to be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, Vec<u8>>,
}

/// Destination for outbound messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Sends one message. No retries.
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Whether the sink can currently reach the broker.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Parses the configured compression name.
pub fn compression_from_str(name: &str) -> Compression {
    match name {
        "gzip" => Compression::Gzip,
        "snappy" => Compression::Snappy,
        "lz4" => Compression::Lz4,
        "zstd" => Compression::Zstd,
        _ => Compression::NoCompression,
    }
}

/// Fail-fast window opened by a failed send.
///
/// While open the sink reports unhealthy; once it lapses the next send is
/// let through and either closes the window or reopens it.
#[derive(Debug)]
pub struct DegradeWindow {
    length: Duration,
    until: parking_lot::Mutex<Option<Instant>>,
}

impl DegradeWindow {
    pub fn new(length: Duration) -> Self {
        Self {
            length,
            until: parking_lot::Mutex::new(None),
        }
    }

    /// Opens (or extends) the window from now.
    pub fn open(&self) {
        *self.until.lock() = Some(Instant::now() + self.length);
    }

    /// Closes the window. Returns true if it was open or lapsed but not yet closed.
    pub fn close(&self) -> bool {
        self.until.lock().take().is_some()
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.until.lock(), Some(until) if Instant::now() < until)
    }
}

/// Sink that produces to Redpanda.
pub struct RedpandaSink {
    client: Client,
    config: RedpandaConfig,
    compression: Compression,
    /// Cached partition clients per `topic:partition`
    partitions: Mutex<BTreeMap<String, Arc<PartitionClient>>>,
    /// Cached partition counts per topic
    partition_counts: RwLock<BTreeMap<String, i32>>,
    /// Opened by a failed send, closed by a successful one
    degraded: DegradeWindow,
}

impl RedpandaSink {
    /// Connects the shared client.
    pub async fn connect(config: RedpandaConfig) -> Result<Self> {
        let client = client::connect(&config).await?;
        health().broker.set_healthy();

        Ok(Self {
            client,
            compression: compression_from_str(&config.compression),
            degraded: DegradeWindow::new(config.request_timeout()),
            config,
            partitions: Mutex::new(BTreeMap::new()),
            partition_counts: RwLock::new(BTreeMap::new()),
        })
    }

    /// Number of partitions of `topic`, looked up once and cached.
    async fn partition_count(&self, topic: &str) -> Result<i32> {
        if let Some(count) = self.partition_counts.read().get(topic) {
            return Ok(*count);
        }

        let topics = within(
            self.config.request_timeout(),
            "list topics",
            self.client.list_topics(),
        )
        .await?;

        let count = topics
            .iter()
            .find(|t| t.name == topic)
            .map(|t| t.partitions.len() as i32)
            .ok_or_else(|| Error::broker_unavailable(format!("Topic {} does not exist", topic)))?;

        self.partition_counts.write().insert(topic.to_string(), count);
        Ok(count)
    }

    /// Gets or creates a partition client.
    async fn partition_client(&self, topic: &str, partition: i32) -> Result<Arc<PartitionClient>> {
        let key = format!("{}:{}", topic, partition);
        let mut clients = self.partitions.lock().await;

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let partition_client = within(
            self.config.request_timeout(),
            "partition client",
            self.client
                .partition_client(topic.to_string(), partition, UnknownTopicHandling::Error),
        )
        .await?;

        let partition_client = Arc::new(partition_client);
        clients.insert(key, partition_client.clone());
        Ok(partition_client)
    }

    async fn produce(&self, message: OutboundMessage) -> Result<i64> {
        let partitions = self.partition_count(&message.topic).await?;
        let partition = partition_for(&message.key, partitions);
        let client = self.partition_client(&message.topic, partition).await?;

        let record = Record {
            key: Some(message.key.into_bytes()),
            value: Some(message.payload),
            headers: message.headers,
            timestamp: Utc::now(),
        };

        let offsets = within(
            self.config.request_timeout(),
            "produce",
            client.produce(vec![record], self.compression),
        )
        .await?;

        Ok(offsets.first().copied().unwrap_or(-1))
    }

    fn mark_healthy(&self) {
        if self.degraded.close() {
            health().broker.set_healthy();
            debug!("Broker send path recovered");
        }
    }

    /// Fails fast for one request timeout, then lets traffic through again.
    fn mark_degraded(&self, reason: &str) {
        self.degraded.open();
        health().broker.set_unhealthy(reason);
        warn!(reason, "Broker send path degraded");
    }
}

#[async_trait]
impl MessageSink for RedpandaSink {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let topic = message.topic.clone();
        let start = Instant::now();

        match self.produce(message).await {
            Ok(offset) => {
                self.mark_healthy();
                let elapsed = start.elapsed();
                metrics().publish_latency_ms.observe(elapsed.as_millis() as u64);
                debug!(
                    topic = %topic,
                    offset,
                    latency_ms = %elapsed.as_millis(),
                    "Produced metric delta"
                );
                Ok(())
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "Failed to produce metric delta");
                self.mark_degraded(&e.to_string());
                Err(e)
            }
        }
    }

    fn is_healthy(&self) -> bool {
        !self.degraded.is_open()
    }
}
