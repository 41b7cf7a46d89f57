//! Common test setup functions.

use metric_services::MetricServices;
use redpanda::{MessageSink, MetricPublisher, PublisherConfig, PublisherTask};
use std::sync::Arc;

use crate::mocks::MockSink;

pub const TOPIC: &str = "metric-events";

/// Publisher, services and a capturing sink wired together.
///
/// Runs the real publisher worker against [`MockSink`], so everything except
/// the broker transport is production code.
pub struct TestContext {
    pub sink: MockSink,
    pub publisher: MetricPublisher,
    pub services: MetricServices,
    task: PublisherTask,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(&PublisherConfig::default())
    }

    pub fn with_config(config: &PublisherConfig) -> Self {
        let sink = MockSink::new();
        let (publisher, task) =
            MetricPublisher::start(Arc::new(sink.clone()) as Arc<dyn MessageSink>, config);
        let services = MetricServices::new(publisher.clone(), TOPIC);

        Self {
            sink,
            publisher,
            services,
            task,
        }
    }

    /// Drops every publisher handle and waits for the worker to drain.
    /// Returns the number of messages the worker sent.
    pub async fn drain(self) -> u64 {
        let Self {
            publisher,
            services,
            task,
            ..
        } = self;
        drop(services);
        drop(publisher);
        task.join().await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
