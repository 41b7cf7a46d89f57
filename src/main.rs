//! Metric pipeline host.
//!
//! Startup sequence:
//! - Provision broker topics (bounded connection retries, fatal on exhaustion)
//! - Connect the shared producer and start the publisher worker
//! - Hand the metric services to the write paths
//! - On shutdown, drain queued deltas before exiting

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use metric_services::MetricServices;
use redpanda::{
    load_topic_specs, AdminBootstrap, MetricPublisher, RedpandaConfig, RedpandaConnector,
    RedpandaSink,
};
use telemetry::{health, init_tracing, metrics, TracingConfig};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    redpanda: RedpandaConfig,

    #[serde(default)]
    logging: TracingConfig,

    /// Interval for logging pipeline counters (0 disables)
    #[serde(default = "default_stats_interval_secs")]
    stats_interval_secs: u64,
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redpanda: RedpandaConfig::default(),
            logging: TracingConfig::default(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires explicit crypto provider selection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.logging.clone().with_env_overrides());

    info!("Starting metric pipeline v{}", env!("CARGO_PKG_VERSION"));
    info!(
        brokers = %config.redpanda.broker_string(),
        topic = %config.redpanda.topic,
        sasl = config.redpanda.credentials().is_some(),
        "Loaded broker config"
    );

    // Topics must exist before anything publishes. Connection exhaustion aborts startup.
    let specs = load_topic_specs(&config.redpanda.admin.topics_file);
    let mut bootstrap = AdminBootstrap::new(
        config.redpanda.admin.clone(),
        RedpandaConnector::new(config.redpanda.clone()),
    );
    let report = bootstrap
        .run(&config.redpanda.brokers, specs)
        .await
        .context("Broker bootstrap failed")?;

    if !report.is_complete() {
        warn!(
            failed = ?report.failed(),
            batch_error = ?report.batch_error,
            "Starting with incomplete topic provisioning"
        );
    }

    let sink = RedpandaSink::connect(config.redpanda.clone())
        .await
        .context("Failed to create Redpanda producer")?;

    let (publisher, publisher_task) =
        MetricPublisher::start(Arc::new(sink), &config.redpanda.publisher);

    let services = MetricServices::new(publisher, &config.redpanda.topic);
    info!(
        health = ?health().report().status,
        "Metric services ready"
    );

    let stats_handle = (config.stats_interval_secs > 0)
        .then(|| start_stats_task(Duration::from_secs(config.stats_interval_secs)));

    shutdown_signal().await;

    info!("Shutting down...");
    if let Some(handle) = stats_handle {
        handle.abort();
    }

    // Dropping the last publisher handle lets the worker drain and exit.
    drop(services);
    let sent = publisher_task.join().await;

    info!(sent, "Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("METRICS")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate's nested parsing doesn't handle underscored field names reliably
    if let Ok(brokers) = std::env::var("METRICS_REDPANDA_BROKERS") {
        config.redpanda.brokers = brokers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(topic) = std::env::var("METRICS_REDPANDA_TOPIC") {
        config.redpanda.topic = topic;
    }
    if let Ok(username) = std::env::var("METRICS_REDPANDA_SASL_USERNAME") {
        config.redpanda.sasl_username = Some(username);
    }
    if let Ok(password) = std::env::var("METRICS_REDPANDA_SASL_PASSWORD") {
        config.redpanda.sasl_password = Some(password);
    }
    if let Ok(path) = std::env::var("METRICS_TOPICS_FILE") {
        config.redpanda.admin.topics_file = path;
    }

    Ok(config)
}

/// Periodically logs pipeline counters.
fn start_stats_task(period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let snapshot = metrics().snapshot();
            info!(
                enqueued = snapshot.events_enqueued,
                published = snapshot.events_published,
                rejected = snapshot.events_rejected,
                errors = snapshot.publish_errors,
                queue_depth = snapshot.queue_depth,
                latency_mean_ms = snapshot.publish_latency_mean_ms,
                "Pipeline stats"
            );
            if !health().broker.is_healthy() {
                error!(reason = ?health().broker.message(), "Broker send path unhealthy");
            }
        }
    })
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
