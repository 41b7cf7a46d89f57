//! Testcontainer setup for Redpanda.
//!
//! Redpanda advertises a fixed address, so the Kafka port is mapped to a
//! fixed host port instead of a random one.

use pipeline_core::Result;
use redpanda::{health::check_connection, RedpandaConfig};
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

pub const KAFKA_HOST_PORT: u16 = 19092;

/// Running broker plus a config pointing at it.
pub struct RedpandaContainer {
    #[allow(dead_code)]
    container: Option<ContainerAsync<GenericImage>>,
    pub config: RedpandaConfig,
}

impl RedpandaContainer {
    /// Start a Redpanda container, or reuse `METRICS_TEST_BROKERS` when set.
    pub async fn start() -> Result<Self> {
        if let Some(brokers) = std::env::var("METRICS_TEST_BROKERS")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            return Ok(Self {
                container: None,
                config: config_for(brokers.split(',').map(|b| b.trim().to_string()).collect()),
            });
        }

        let container = GenericImage::new("docker.redpanda.com/redpandadata/redpanda", "v24.1.7")
            .with_exposed_port(9092.tcp())
            .with_wait_for(WaitFor::seconds(5))
            .with_mapped_port(KAFKA_HOST_PORT, 9092.tcp())
            .with_cmd([
                "redpanda",
                "start",
                "--mode",
                "dev-container",
                "--smp",
                "1",
                "--kafka-addr",
                "0.0.0.0:9092",
                "--advertise-kafka-addr",
                "127.0.0.1:19092",
            ])
            .start()
            .await
            .map_err(|e| pipeline_core::Error::internal(format!("Failed to start Redpanda: {}", e)))?;

        let config = config_for(vec![format!("127.0.0.1:{}", KAFKA_HOST_PORT)]);
        wait_for_broker(&config, Duration::from_secs(30)).await;

        Ok(Self {
            container: Some(container),
            config,
        })
    }
}

fn config_for(brokers: Vec<String>) -> RedpandaConfig {
    let mut config = RedpandaConfig {
        brokers,
        ..RedpandaConfig::default()
    };
    config.admin.retry_delay_ms = 500;
    config.admin.max_attempts = 10;
    config
}

/// Wait for the broker to answer metadata requests.
async fn wait_for_broker(config: &RedpandaConfig, timeout: Duration) {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check_connection(config).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    tracing::warn!("Redpanda did not become ready within {:?}", timeout);
}
