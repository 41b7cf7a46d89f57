//! Test fixtures and small consumer-side helpers.

use pipeline_core::{MetricDeltaEvent, MetricEntity};
use redpanda::{default_topic_specs, AdminConfig, OutboundMessage, PublisherConfig, TopicSpec};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Admin config with short delays so retry tests run fast.
pub fn fast_admin_config(max_attempts: u32) -> AdminConfig {
    AdminConfig {
        max_attempts,
        retry_delay_ms: 5,
        create_timeout_ms: 1_000,
        available_brokers: 1,
        ..AdminConfig::default()
    }
}

pub fn brokers() -> Vec<String> {
    vec!["localhost:19092".to_string()]
}

/// Publisher config with a small queue and short enqueue timeout.
pub fn small_publisher_config(queue_capacity: usize) -> PublisherConfig {
    PublisherConfig {
        queue_capacity,
        enqueue_timeout_ms: 20,
    }
}

/// The topic set the service declares at startup.
pub fn service_topics() -> Vec<TopicSpec> {
    default_topic_specs()
}

/// Decodes every captured payload.
pub fn decode_all(messages: &[OutboundMessage]) -> Vec<MetricDeltaEvent> {
    messages
        .iter()
        .map(|m| MetricDeltaEvent::from_json_slice(&m.payload).expect("captured payload decodes"))
        .collect()
}

/// Counter key as the consumer stores it.
pub type CounterKey = (MetricEntity, i64, &'static str);

/// Folds deltas into counters the way the consumer does: one application per
/// `event_id`, so redelivered messages do not double count.
pub fn apply_deltas(events: &[MetricDeltaEvent]) -> HashMap<CounterKey, i64> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut counters = HashMap::new();

    for event in events {
        if !seen.insert(event.event_id()) {
            continue;
        }
        let key = (event.entity(), event.metric_id(), event.column().as_str());
        *counters.entry(key).or_insert(0) += event.action().delta();
    }
    counters
}
