//! Topic declarations and the declarative topic file.

use pipeline_core::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};
use validator::{Validate, ValidationError};

/// Logical channels known at deploy time.
pub mod topic {
    /// Metric-delta events.
    pub const METRIC_EVENTS: &str = "metric-events";
    /// Outbound email requests. Not published by this crate.
    pub const EMAIL_EVENTS: &str = "email-events";
    /// Generic notifications. Not published by this crate.
    pub const NOTIFICATION_EVENTS: &str = "notification-events";

    pub const ALL: &[&str] = &[METRIC_EVENTS, EMAIL_EVENTS, NOTIFICATION_EVENTS];
}

static TOPIC_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]{1,249}$").expect("topic name pattern is valid")
});

fn validate_topic_name(name: &str) -> std::result::Result<(), ValidationError> {
    if name == "." || name == ".." || !TOPIC_NAME.is_match(name) {
        let mut err = ValidationError::new("invalid_topic_name");
        err.message = Some(format!("'{}' is not a legal topic name", name).into());
        return Err(err);
    }
    Ok(())
}

/// A topic to provision at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TopicSpec {
    #[validate(custom(function = "validate_topic_name"))]
    pub name: String,
    #[serde(default = "default_partitions")]
    #[validate(range(min = 1))]
    pub partitions: i32,
    #[serde(default = "default_replication_factor")]
    #[validate(range(min = 1))]
    pub replication_factor: i16,
}

fn default_partitions() -> i32 {
    1
}

fn default_replication_factor() -> i16 {
    1
}

impl TopicSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: default_partitions(),
            replication_factor: default_replication_factor(),
        }
    }

    pub fn with_partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_replication(mut self, factor: i16) -> Self {
        self.replication_factor = factor;
        self
    }

    /// Checks the declaration before it is sent to the broker.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::topic_config(format!("{}: {}", self.name, e)))
    }
}

/// Shape of the topic file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicsFile {
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
}

/// Topics provisioned when no file is supplied.
pub fn default_topic_specs() -> Vec<TopicSpec> {
    vec![
        TopicSpec::new(topic::METRIC_EVENTS).with_partitions(6),
        TopicSpec::new(topic::EMAIL_EVENTS).with_partitions(3),
        TopicSpec::new(topic::NOTIFICATION_EVENTS).with_partitions(3),
    ]
}

/// Loads topic declarations from `path`.
///
/// The format follows the file extension (toml, yaml, json). A missing or
/// malformed file yields an empty list and a warning; provisioning then does
/// nothing, which is what environments that create topics out of band want.
pub fn load_topic_specs(path: impl AsRef<Path>) -> Vec<TopicSpec> {
    let path = path.as_ref();

    if !path.is_file() {
        warn!(path = %path.display(), "Topic file not found, skipping provisioning");
        return Vec::new();
    }

    let parsed = ::config::Config::builder()
        .add_source(::config::File::from(path))
        .build()
        .and_then(|c| c.try_deserialize::<TopicsFile>());

    match parsed {
        Ok(file) => {
            debug!(path = %path.display(), topics = file.topics.len(), "Loaded topic file");
            file.topics
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed topic file, skipping provisioning");
            Vec::new()
        }
    }
}
