//! Administrative broker access used during startup.
//!
//! The bootstrap only talks to these traits; `RedpandaConnector` is the
//! rskafka-backed implementation. The admin connection is never shared with
//! the publish path.

use async_trait::async_trait;
use pipeline_core::{Error, Result};
use rskafka::client::error::{Error as ClientError, ProtocolError};
use rskafka::client::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::client::{client_builder, is_auth_failure, within};
use crate::config::RedpandaConfig;
use crate::topics::TopicSpec;

/// Why an admin connection attempt failed.
#[derive(Debug)]
pub enum ConnectError {
    /// Worth retrying (refused, reset, DNS not ready yet).
    Transient(String),
    /// Retrying cannot help.
    Fatal(Error),
}

/// Per-topic result of a creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicOutcome {
    Created,
    AlreadyExists,
    Failed(String),
}

impl TopicOutcome {
    /// Created and already-existing topics both count as provisioned.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::AlreadyExists)
    }
}

/// Opens administrative connections.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    async fn connect(&self) -> std::result::Result<Arc<dyn TopicAdmin>, ConnectError>;
}

/// Topic management on a connected cluster.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// Brokers available to host replicas.
    fn broker_count(&self) -> usize;

    /// Creates a batch of topics, pushing one outcome per topic into
    /// `outcomes` as each finishes.
    ///
    /// Outcomes pushed before an error, or before the caller abandons the
    /// call, remain valid. An error means the rest of the batch could not be
    /// issued.
    async fn create_topics(
        &self,
        topics: &[TopicSpec],
        timeout: Duration,
        outcomes: &mut Vec<(String, TopicOutcome)>,
    ) -> Result<()>;
}

impl std::fmt::Debug for dyn TopicAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicAdmin")
            .field("broker_count", &self.broker_count())
            .finish()
    }
}

/// Connector backed by rskafka.
pub struct RedpandaConnector {
    config: RedpandaConfig,
}

impl RedpandaConnector {
    pub fn new(config: RedpandaConfig) -> Self {
        Self { config }
    }
}

fn classify(e: Error) -> ConnectError {
    let message = e.to_string();
    if is_auth_failure(&message) {
        ConnectError::Fatal(e)
    } else {
        ConnectError::Transient(message)
    }
}

#[async_trait]
impl AdminConnector for RedpandaConnector {
    async fn connect(&self) -> std::result::Result<Arc<dyn TopicAdmin>, ConnectError> {
        let limit = self.config.admin.connect_timeout();
        let client = within(limit, "connect", client_builder(&self.config).build())
            .await
            .map_err(classify)?;

        // Metadata round-trip; `build` alone can succeed before the cluster answers.
        let topics = within(limit, "list topics", client.list_topics())
            .await
            .map_err(classify)?;
        debug!(existing_topics = topics.len(), "Admin connection established");

        Ok(Arc::new(RedpandaAdmin {
            client,
            available_brokers: self.config.admin.available_brokers,
        }))
    }
}

/// Admin handle over a live rskafka client.
pub struct RedpandaAdmin {
    client: Client,
    available_brokers: usize,
}

#[async_trait]
impl TopicAdmin for RedpandaAdmin {
    fn broker_count(&self) -> usize {
        self.available_brokers
    }

    async fn create_topics(
        &self,
        topics: &[TopicSpec],
        timeout: Duration,
        outcomes: &mut Vec<(String, TopicOutcome)>,
    ) -> Result<()> {
        let controller = self
            .client
            .controller_client()
            .map_err(|e| Error::broker_unavailable(format!("No controller: {}", e)))?;

        let deadline = Instant::now() + timeout;

        for spec in topics {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                outcomes.push((spec.name.clone(), TopicOutcome::Failed("batch deadline passed".into())));
                continue;
            }

            let timeout_ms = i32::try_from(remaining.as_millis()).unwrap_or(i32::MAX);
            let request = controller.create_topic(
                spec.name.clone(),
                spec.partitions,
                spec.replication_factor,
                timeout_ms,
            );

            let outcome = match tokio::time::timeout(remaining, request).await {
                Ok(Ok(())) => TopicOutcome::Created,
                Ok(Err(ClientError::ServerError {
                    protocol_error: ProtocolError::TopicAlreadyExists,
                    ..
                })) => TopicOutcome::AlreadyExists,
                Ok(Err(e)) => TopicOutcome::Failed(e.to_string()),
                Err(_) => TopicOutcome::Failed(format!("timed out after {}ms", remaining.as_millis())),
            };
            outcomes.push((spec.name.clone(), outcome));
        }

        Ok(())
    }
}
