//! Metric publisher: the single choke point every counter change goes through.
//!
//! Request handlers call [`MetricPublisher::publish`], which serializes the
//! event and hands it to a bounded queue. One worker task drains the queue
//! into a [`MessageSink`]. Handlers never wait on the broker round-trip.

use pipeline_core::{Error, MetricDeltaEvent, Result, CONTENT_TYPE, SCHEMA_VERSION};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PublisherConfig;
use crate::producer::{MessageSink, OutboundMessage};

/// Builds the broker record for an event.
pub fn encode_event(event: &MetricDeltaEvent, topic: &str) -> Result<OutboundMessage> {
    let payload = event.to_json_bytes()?;

    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), CONTENT_TYPE.as_bytes().to_vec());
    headers.insert(
        "schema-version".to_string(),
        SCHEMA_VERSION.to_string().into_bytes(),
    );
    headers.insert("entity".to_string(), event.entity().as_str().as_bytes().to_vec());

    Ok(OutboundMessage {
        topic: topic.to_string(),
        key: event.partition_key(),
        payload,
        headers,
    })
}

/// Cloneable handle to the outbound queue.
///
/// Constructed once at startup and passed to every metric service. When the
/// last handle is dropped the worker drains the queue and exits.
#[derive(Clone)]
pub struct MetricPublisher {
    tx: mpsc::Sender<OutboundMessage>,
    sink: Arc<dyn MessageSink>,
    enqueue_timeout: Duration,
}

/// The running send worker.
pub struct PublisherTask {
    handle: JoinHandle<u64>,
}

impl PublisherTask {
    /// Waits for the worker to drain the queue. Returns the number of messages it sent.
    pub async fn join(self) -> u64 {
        match self.handle.await {
            Ok(sent) => sent,
            Err(e) => {
                error!(error = %e, "Publisher worker terminated abnormally");
                0
            }
        }
    }
}

impl MetricPublisher {
    /// Creates the queue and spawns its worker.
    pub fn start(sink: Arc<dyn MessageSink>, config: &PublisherConfig) -> (Self, PublisherTask) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let handle = tokio::spawn(run_worker(rx, sink.clone()));

        info!(
            queue_capacity = config.queue_capacity,
            enqueue_timeout_ms = config.enqueue_timeout_ms,
            "Metric publisher started"
        );

        (
            Self {
                tx,
                sink,
                enqueue_timeout: config.enqueue_timeout(),
            },
            PublisherTask { handle },
        )
    }

    /// Queues `event` for `topic`.
    ///
    /// Fails with `BrokerUnavailable` when the sink is known to be down or the
    /// queue stays full past the enqueue timeout. Never retries.
    pub async fn publish(&self, event: &MetricDeltaEvent, topic: &str) -> Result<()> {
        let message = encode_event(event, topic)?;

        if !self.sink.is_healthy() {
            metrics().events_rejected.inc();
            return Err(Error::broker_unavailable("broker send path is down"));
        }

        // Counted before the worker can see the message.
        match tokio::time::timeout(self.enqueue_timeout, self.tx.reserve()).await {
            Ok(Ok(slot)) => {
                metrics().events_enqueued.inc();
                metrics().queue_depth.inc();
                slot.send(message);
                debug!(
                    event_id = %event.event_id(),
                    entity = %event.entity(),
                    column = event.column().as_str(),
                    action = %event.action(),
                    metric_id = event.metric_id(),
                    "Queued metric delta"
                );
                Ok(())
            }
            Ok(Err(_)) => {
                metrics().events_rejected.inc();
                Err(Error::broker_unavailable("publisher worker has stopped"))
            }
            Err(_) => {
                metrics().events_rejected.inc();
                warn!(
                    timeout_ms = self.enqueue_timeout.as_millis() as u64,
                    "Metric queue full"
                );
                Err(Error::broker_unavailable("metric queue is full"))
            }
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<OutboundMessage>, sink: Arc<dyn MessageSink>) -> u64 {
    let mut sent = 0u64;

    while let Some(message) = rx.recv().await {
        metrics().queue_depth.dec();
        let key = message.key.clone();

        match sink.send(message).await {
            Ok(()) => {
                sent += 1;
                metrics().events_published.inc();
            }
            Err(e) => {
                metrics().publish_errors.inc();
                error!(key = %key, error = %e, "Dropped metric delta");
            }
        }
    }

    info!(sent, "Metric publisher drained");
    sent
}
