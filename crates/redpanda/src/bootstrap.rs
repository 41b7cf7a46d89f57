//! Startup provisioning of broker topics.
//!
//! `NotConnected → Connecting (retry loop) → Connected | Aborted`, then
//! `Provisioning → Provisioned`. Exhausting the connection budget aborts
//! startup. Once connected, provisioning always completes: per-topic
//! failures are reported, not raised.

use pipeline_core::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use telemetry::{health, metrics};
use tracing::{error, info, warn};

use crate::admin::{AdminConnector, ConnectError, TopicAdmin, TopicOutcome};
use crate::client::validate_broker_addresses;
use crate::config::AdminConfig;
use crate::topics::TopicSpec;

/// Bootstrap lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    NotConnected,
    Connecting { attempt: u32 },
    Connected,
    Aborted,
    Provisioning,
    Provisioned,
}

/// What happened to one declared topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicReport {
    pub name: String,
    pub partitions: i32,
    /// Replication factor actually submitted (after clamping)
    pub replication_factor: i16,
    pub outcome: TopicOutcome,
}

/// Result of a provisioning pass.
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    pub topics: Vec<TopicReport>,
    /// Topics whose replication factor was lowered to fit the cluster
    pub clamped: Vec<String>,
    /// Set when the creation batch failed as a whole
    pub batch_error: Option<String>,
}

impl ProvisionReport {
    /// True when every declared topic was created or already existed.
    pub fn is_complete(&self) -> bool {
        self.batch_error.is_none() && self.topics.iter().all(|t| t.outcome.is_success())
    }

    pub fn outcome(&self, name: &str) -> Option<&TopicOutcome> {
        self.topics.iter().find(|t| t.name == name).map(|t| &t.outcome)
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, TopicOutcome::Created))
    }

    pub fn already_existing(&self) -> usize {
        self.count(|o| matches!(o, TopicOutcome::AlreadyExists))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.topics
            .iter()
            .filter(|t| !t.outcome.is_success())
            .map(|t| t.name.as_str())
            .collect()
    }

    fn count(&self, pred: impl Fn(&TopicOutcome) -> bool) -> usize {
        self.topics.iter().filter(|t| pred(&t.outcome)).count()
    }
}

/// Connects to the broker with bounded retries and provisions topics.
pub struct AdminBootstrap<C> {
    config: AdminConfig,
    connector: C,
    state: BootstrapState,
    attempts: u32,
}

impl<C: AdminConnector> AdminBootstrap<C> {
    pub fn new(config: AdminConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            state: BootstrapState::NotConnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Opens the admin connection.
    ///
    /// Transient failures are retried up to `max_attempts` with a fixed delay.
    /// Malformed addresses and fatal connector errors are not retried.
    pub async fn connect(&mut self, brokers: &[String]) -> Result<Arc<dyn TopicAdmin>> {
        if let Err(e) = validate_broker_addresses(brokers) {
            self.state = BootstrapState::Aborted;
            error!(error = %e, "Broker configuration rejected");
            return Err(e);
        }

        let max_attempts = self.config.max_attempts.max(1);
        let delay = self.config.retry_delay();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            self.state = BootstrapState::Connecting { attempt };
            self.attempts = attempt;
            metrics().connect_attempts.inc();

            match self.connector.connect().await {
                Ok(admin) => {
                    self.state = BootstrapState::Connected;
                    info!(attempt, brokers = ?brokers, "Connected to broker admin");
                    return Ok(admin);
                }
                Err(ConnectError::Fatal(e)) => {
                    self.state = BootstrapState::Aborted;
                    error!(attempt, error = %e, "Broker admin connection failed permanently");
                    return Err(e);
                }
                Err(ConnectError::Transient(e)) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Broker admin connection failed"
                    );
                    last_error = e;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        self.state = BootstrapState::Aborted;
        health().broker.set_unhealthy("admin connection exhausted");
        error!(
            attempts = max_attempts,
            last_error = %last_error,
            "Giving up on broker admin connection"
        );
        Err(Error::ConnectionExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    /// Creates every declared topic, tolerating individual failures.
    pub async fn provision(&mut self, admin: &dyn TopicAdmin, specs: Vec<TopicSpec>) -> ProvisionReport {
        self.state = BootstrapState::Provisioning;

        let report = provision_topics(admin, specs, &self.config).await;

        if report.is_complete() {
            health().topics.set_healthy();
        } else {
            health()
                .topics
                .set_unhealthy(format!("not provisioned: {}", report.failed().join(", ")));
        }

        info!(
            created = report.created(),
            existing = report.already_existing(),
            failed = report.failed().len(),
            clamped = report.clamped.len(),
            "Topic provisioning finished"
        );

        self.state = BootstrapState::Provisioned;
        report
    }

    /// Connects, then provisions. Only the connection step can fail.
    pub async fn run(&mut self, brokers: &[String], specs: Vec<TopicSpec>) -> Result<ProvisionReport> {
        let admin = self.connect(brokers).await?;
        Ok(self.provision(admin.as_ref(), specs).await)
    }
}

async fn provision_topics(
    admin: &dyn TopicAdmin,
    specs: Vec<TopicSpec>,
    config: &AdminConfig,
) -> ProvisionReport {
    let mut report = ProvisionReport::default();
    if specs.is_empty() {
        info!("No topics declared, nothing to provision");
        return report;
    }

    let brokers = i16::try_from(admin.broker_count().max(1)).unwrap_or(i16::MAX);
    let mut outcomes: Vec<Option<TopicOutcome>> = Vec::with_capacity(specs.len());
    let mut declared = HashSet::new();
    let mut batch = Vec::new();

    for mut spec in specs {
        let rejected = match spec.check() {
            Err(e) => Some(e),
            Ok(()) if !declared.insert(spec.name.clone()) => Some(Error::topic_config(format!(
                "{}: declared more than once",
                spec.name
            ))),
            Ok(()) => None,
        };

        if let Some(e) = rejected {
            warn!(topic = %spec.name, error = %e, "Skipping invalid topic declaration");
            outcomes.push(Some(TopicOutcome::Failed(e.to_string())));
        } else {
            if spec.replication_factor > brokers {
                warn!(
                    topic = %spec.name,
                    requested = spec.replication_factor,
                    brokers,
                    "Replication factor exceeds available brokers, clamping"
                );
                metrics().replication_clamped.inc();
                report.clamped.push(spec.name.clone());
                spec.replication_factor = brokers;
            }
            batch.push(spec.clone());
            outcomes.push(None);
        }

        report.topics.push(TopicReport {
            name: spec.name.clone(),
            partitions: spec.partitions,
            replication_factor: spec.replication_factor,
            outcome: TopicOutcome::Created,
        });
    }

    // Outcomes collected before a timeout or batch error are kept.
    let mut results = Vec::with_capacity(batch.len());
    let batch_result = if batch.is_empty() {
        Ok(())
    } else {
        match tokio::time::timeout(
            config.create_timeout(),
            admin.create_topics(&batch, config.create_timeout(), &mut results),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::broker_unavailable(format!(
                "topic creation timed out after {:?}",
                config.create_timeout()
            ))),
        }
    };

    if let Err(e) = &batch_result {
        error!(
            error = %e,
            topics = batch.len(),
            completed = results.len(),
            "Topic creation batch failed"
        );
        report.batch_error = Some(e.to_string());
    }

    for (topic, pending) in report.topics.iter_mut().zip(outcomes.iter_mut()) {
        if pending.is_some() {
            continue;
        }
        let reported = results
            .iter()
            .find(|(name, _)| *name == topic.name)
            .map(|(_, outcome)| outcome.clone());

        *pending = Some(match (reported, &report.batch_error) {
            (Some(outcome), _) => outcome,
            (None, Some(batch_error)) => TopicOutcome::Failed(batch_error.clone()),
            (None, None) => TopicOutcome::Failed("no result from broker".into()),
        });
    }

    for (topic, outcome) in report.topics.iter_mut().zip(outcomes) {
        topic.outcome = outcome.unwrap_or_else(|| TopicOutcome::Failed("not attempted".into()));

        match &topic.outcome {
            TopicOutcome::Created => {
                metrics().topics_created.inc();
                info!(topic = %topic.name, partitions = topic.partitions, "Topic created");
            }
            TopicOutcome::AlreadyExists => {
                metrics().topics_existing.inc();
                info!(topic = %topic.name, "Topic already exists");
            }
            TopicOutcome::Failed(reason) => {
                metrics().topics_failed.inc();
                warn!(topic = %topic.name, reason = %reason, "Topic not provisioned");
            }
        }
    }

    report
}
