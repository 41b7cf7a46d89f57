//! Broker client construction shared by the admin and publish paths.

use pipeline_core::{Error, Result};
use rskafka::client::{Client, ClientBuilder, Credentials, SaslConfig};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RedpandaConfig;

/// Creates a TLS configuration for Redpanda Cloud.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Checks that every broker address is `host:port` with a numeric port.
///
/// A malformed address is a configuration error and is never retried.
pub fn validate_broker_addresses(brokers: &[String]) -> Result<()> {
    if brokers.is_empty() {
        return Err(Error::InvalidBrokerAddress("no brokers configured".into()));
    }

    for broker in brokers {
        let valid = broker
            .rsplit_once(':')
            .map(|(host, port)| !host.trim().is_empty() && port.parse::<u16>().is_ok_and(|p| p > 0))
            .unwrap_or(false);

        if !valid {
            return Err(Error::InvalidBrokerAddress(broker.clone()));
        }
    }
    Ok(())
}

/// Returns a client builder with TLS and SASL applied when credentials are set.
pub fn client_builder(config: &RedpandaConfig) -> ClientBuilder {
    let mut builder = ClientBuilder::new(config.brokers.clone());

    if let Some((username, password)) = config.credentials() {
        builder = builder
            .tls_config(create_tls_config())
            .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                username.to_string(),
                password.to_string(),
            )));
    }

    builder
}

/// Awaits one broker call for at most `limit`.
///
/// rskafka retries unreachable brokers internally without a deadline, so
/// every call that can touch the network goes through here.
pub async fn within<T, E, F>(limit: Duration, what: &str, call: F) -> Result<T>
where
    E: Display,
    F: Future<Output = std::result::Result<T, E>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::broker_unavailable(format!("{} failed: {}", what, e))),
        Err(_) => Err(Error::broker_unavailable(format!(
            "{} timed out after {}ms",
            what,
            limit.as_millis()
        ))),
    }
}

/// Whether a client error is a credential or TLS rejection that retrying cannot fix.
pub fn is_auth_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["sasl", "authentication", "certificate", "tls handshake", "unknownissuer"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Connects once, without retries, bounded by `admin.connect_timeout_ms`.
pub async fn connect(config: &RedpandaConfig) -> Result<Client> {
    validate_broker_addresses(&config.brokers)?;

    within(
        config.admin.connect_timeout(),
        "connect",
        client_builder(config).build(),
    )
    .await
}
