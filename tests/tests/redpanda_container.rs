//! Tests against a real Redpanda broker.
//!
//! Requires Docker. Set `METRICS_TEST_BROKERS` to reuse a running broker.
//! Run with `cargo test -p integration-tests -- --ignored`.

use integration_tests::containers::RedpandaContainer;
use integration_tests::fixtures;
use pipeline_core::{MetricAction, MetricDeltaEvent, UserColumn};
use redpanda::health::missing_topics;
use redpanda::{
    encode_event, AdminBootstrap, MessageSink, RedpandaConnector, RedpandaSink, TopicOutcome,
};

fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_provisioning_twice_against_broker() {
    install_crypto_provider();
    let broker = RedpandaContainer::start().await.expect("broker starts");
    let config = broker.config.clone();

    let mut first = AdminBootstrap::new(config.admin.clone(), RedpandaConnector::new(config.clone()));
    let report = first
        .run(&config.brokers, fixtures::service_topics())
        .await
        .expect("first bootstrap connects");
    assert!(report.is_complete(), "{:?}", report);

    let mut second = AdminBootstrap::new(config.admin.clone(), RedpandaConnector::new(config.clone()));
    let report = second
        .run(&config.brokers, fixtures::service_topics())
        .await
        .expect("second bootstrap connects");
    assert!(report.is_complete(), "{:?}", report);
    assert_eq!(report.outcome("metric-events"), Some(&TopicOutcome::AlreadyExists));

    let missing = missing_topics(&config, &["metric-events", "email-events", "notification-events"]).await;
    assert!(missing.is_empty(), "missing: {:?}", missing);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_sink_produces_to_broker() {
    install_crypto_provider();
    let broker = RedpandaContainer::start().await.expect("broker starts");
    let config = broker.config.clone();

    let mut bootstrap = AdminBootstrap::new(config.admin.clone(), RedpandaConnector::new(config.clone()));
    bootstrap
        .run(&config.brokers, fixtures::service_topics())
        .await
        .expect("bootstrap connects");

    let sink = RedpandaSink::connect(config.clone()).await.expect("sink connects");
    let event = MetricDeltaEvent::new(42, UserColumn::FollowerCount, MetricAction::Sum, "follow-service");

    sink.send(encode_event(&event, &config.topic).unwrap())
        .await
        .expect("record accepted");
    assert!(sink.is_healthy());
}
