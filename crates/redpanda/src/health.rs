//! Broker health probes.

use crate::client::{self, within};
use crate::config::RedpandaConfig;
use std::collections::HashSet;
use tracing::{debug, error};

/// Check broker connection health.
pub async fn check_connection(config: &RedpandaConfig) -> bool {
    let client = match client::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Broker health check failed");
            return false;
        }
    };

    match within(config.request_timeout(), "list topics", client.list_topics()).await {
        Ok(topics) => {
            debug!(topics = topics.len(), "Broker connection healthy");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to list broker topics");
            false
        }
    }
}

/// Returns the required topics that do not exist. Unreachable brokers report all of them.
pub async fn missing_topics(config: &RedpandaConfig, topics: &[&str]) -> Vec<String> {
    let existing: HashSet<String> = match client::connect(config).await {
        Ok(client) => match within(config.request_timeout(), "list topics", client.list_topics()).await {
            Ok(found) => found.into_iter().map(|t| t.name).collect(),
            Err(_) => HashSet::new(),
        },
        Err(_) => HashSet::new(),
    };

    topics
        .iter()
        .filter(|t| !existing.contains(**t))
        .map(|t| t.to_string())
        .collect()
}
