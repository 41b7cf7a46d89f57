//! Mock implementations for testing.
//!
//! `MockSink` stands in for the Redpanda producer and `MockConnector` /
//! `MockAdmin` for the admin connection. They implement the same traits as
//! the real types, so the bootstrap and publisher run unchanged.

use async_trait::async_trait;
use parking_lot::Mutex;
use pipeline_core::{Error, Result};
use redpanda::{AdminConnector, ConnectError, MessageSink, OutboundMessage, TopicAdmin, TopicOutcome, TopicSpec};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Sink that captures messages in memory.
#[derive(Clone)]
pub struct MockSink {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
    should_fail: Arc<AtomicBool>,
    healthy: Arc<AtomicBool>,
    /// When set, each send waits for a permit
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(AtomicBool::new(false)),
            healthy: Arc::new(AtomicBool::new(true)),
            gate: Arc::new(Mutex::new(None)),
        }
    }

    /// All messages sent through this sink.
    pub fn captured(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Makes every send fail after it has been dequeued.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Controls what `is_healthy` reports.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Blocks sends until [`release`](Self::release) is called.
    pub fn pause(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets blocked and future sends through.
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSink for MockSink {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| Error::internal("gate closed"))?;
        }

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::broker_unavailable("Mock sink failure"));
        }

        self.messages.lock().push(message);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// In-memory cluster with failure injection.
pub struct MockAdmin {
    topics: Mutex<BTreeMap<String, TopicSpec>>,
    submitted: Mutex<Vec<TopicSpec>>,
    rejected_topics: Mutex<HashSet<String>>,
    batch_failure: AtomicBool,
    batch_delay: Mutex<Option<Duration>>,
    stall_after: Mutex<Option<usize>>,
    brokers: usize,
}

impl MockAdmin {
    pub fn new(brokers: usize) -> Self {
        Self {
            topics: Mutex::new(BTreeMap::new()),
            submitted: Mutex::new(Vec::new()),
            rejected_topics: Mutex::new(HashSet::new()),
            batch_failure: AtomicBool::new(false),
            batch_delay: Mutex::new(None),
            stall_after: Mutex::new(None),
            brokers,
        }
    }

    /// Topics that exist on the mock cluster.
    pub fn topic_names(&self) -> Vec<String> {
        self.topics.lock().keys().cloned().collect()
    }

    pub fn topic(&self, name: &str) -> Option<TopicSpec> {
        self.topics.lock().get(name).cloned()
    }

    /// Every spec submitted for creation, in order.
    pub fn submitted(&self) -> Vec<TopicSpec> {
        self.submitted.lock().clone()
    }

    /// Makes creation of `name` fail as the broker would on a quota or policy error.
    pub fn reject_topic(&self, name: &str) {
        self.rejected_topics.lock().insert(name.to_string());
    }

    /// Makes the whole batch call fail.
    pub fn set_batch_failure(&self, fail: bool) {
        self.batch_failure.store(fail, Ordering::SeqCst);
    }

    /// Delays the batch call.
    pub fn set_batch_delay(&self, delay: Duration) {
        *self.batch_delay.lock() = Some(delay);
    }

    /// Creates `n` topics, then hangs like a controller that stopped answering.
    pub fn stall_after(&self, n: usize) {
        *self.stall_after.lock() = Some(n);
    }
}

#[async_trait]
impl TopicAdmin for MockAdmin {
    fn broker_count(&self) -> usize {
        self.brokers
    }

    async fn create_topics(
        &self,
        topics: &[TopicSpec],
        _timeout: Duration,
        outcomes: &mut Vec<(String, TopicOutcome)>,
    ) -> Result<()> {
        let delay = *self.batch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.batch_failure.load(Ordering::SeqCst) {
            return Err(Error::broker_unavailable("Mock cluster rejected request"));
        }

        let stall_after = *self.stall_after.lock();
        for (i, spec) in topics.iter().enumerate() {
            if stall_after == Some(i) {
                std::future::pending::<()>().await;
            }
            self.submitted.lock().push(spec.clone());

            let outcome = if self.rejected_topics.lock().contains(&spec.name) {
                TopicOutcome::Failed("POLICY_VIOLATION".into())
            } else if spec.partitions < 1 {
                TopicOutcome::Failed("INVALID_PARTITIONS".into())
            } else if spec.replication_factor as usize > self.brokers {
                TopicOutcome::Failed("INVALID_REPLICATION_FACTOR".into())
            } else {
                let mut existing = self.topics.lock();
                if existing.contains_key(&spec.name) {
                    TopicOutcome::AlreadyExists
                } else {
                    existing.insert(spec.name.clone(), spec.clone());
                    TopicOutcome::Created
                }
            };
            outcomes.push((spec.name.clone(), outcome));
        }
        Ok(())
    }
}

/// Connector that fails a configurable number of times.
#[derive(Clone)]
pub struct MockConnector {
    admin: Arc<MockAdmin>,
    attempts: Arc<AtomicU32>,
    fail_first: Arc<AtomicU32>,
    fatal: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new(admin: Arc<MockAdmin>) -> Self {
        Self {
            admin,
            attempts: Arc::new(AtomicU32::new(0)),
            fail_first: Arc::new(AtomicU32::new(0)),
            fatal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fails the first `n` attempts with a transient error.
    pub fn fail_first(self, n: u32) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    /// Fails every attempt with a non-retryable error.
    pub fn fatal(self) -> Self {
        self.fatal.store(true, Ordering::SeqCst);
        self
    }

    /// Connection attempts observed.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn admin(&self) -> Arc<MockAdmin> {
        self.admin.clone()
    }
}

#[async_trait]
impl AdminConnector for MockConnector {
    async fn connect(&self) -> std::result::Result<Arc<dyn TopicAdmin>, ConnectError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fatal.load(Ordering::SeqCst) {
            return Err(ConnectError::Fatal(Error::InvalidBrokerAddress(
                "SASL authentication rejected".into(),
            )));
        }

        if attempt <= self.fail_first.load(Ordering::SeqCst) {
            return Err(ConnectError::Transient(format!(
                "Connection refused (attempt {})",
                attempt
            )));
        }

        Ok(self.admin.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_admin_reports_existing_topics() {
        let admin = MockAdmin::new(1);
        let specs = vec![TopicSpec::new("a"), TopicSpec::new("b")];

        let mut first = Vec::new();
        admin.create_topics(&specs, Duration::from_secs(1), &mut first).await.unwrap();
        assert!(first.iter().all(|(_, o)| *o == TopicOutcome::Created));

        let mut second = Vec::new();
        admin.create_topics(&specs, Duration::from_secs(1), &mut second).await.unwrap();
        assert!(second.iter().all(|(_, o)| *o == TopicOutcome::AlreadyExists));
        assert_eq!(admin.topic_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_mock_connector_counts_attempts() {
        let connector = MockConnector::new(Arc::new(MockAdmin::new(1))).fail_first(2);

        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_ok());
        assert_eq!(connector.attempts(), 3);
    }
}
