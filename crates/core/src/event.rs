//! The metric-delta wire contract.
//!
//! A `MetricDeltaEvent` asks the external consumer to move one counter,
//! identified by `(entity, metric_id, column)`, by exactly one. Events are
//! immutable; a wrong delta is corrected by publishing its compensation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metric::{MetricAction, MetricColumn, MetricEntity};

/// Version advertised in the record headers.
pub const SCHEMA_VERSION: u16 = 1;

/// Content type of the encoded payload.
pub const CONTENT_TYPE: &str = "application/json";

/// A single ±1 counter change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub struct MetricDeltaEvent {
    event_id: Uuid,
    metric_id: i64,
    column: MetricColumn,
    action: MetricAction,
    created_at: DateTime<Utc>,
    source: String,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl MetricDeltaEvent {
    /// Creates an event from a typed column. The entity is implied by the column.
    pub fn new(
        metric_id: i64,
        column: impl Into<MetricColumn>,
        action: MetricAction,
        source: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            metric_id,
            column: column.into(),
            action,
            created_at: Utc::now(),
            source: source.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates an event from an untyped column name.
    ///
    /// Fails with `InvalidColumn` when `column` is not in the closed set of
    /// `entity`; nothing is built, so nothing can be published.
    pub fn build(
        metric_id: i64,
        entity: MetricEntity,
        column: &str,
        action: MetricAction,
        source: impl Into<String>,
    ) -> Result<Self> {
        let column = MetricColumn::parse(entity, column)?;
        Ok(Self::new(metric_id, column, action, source))
    }

    /// Attaches a metadata entry for consumer-side enrichment.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a new event that undoes this one.
    pub fn compensation(&self, source: impl Into<String>) -> Self {
        Self::new(self.metric_id, self.column, self.action.inverse(), source)
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn metric_id(&self) -> i64 {
        self.metric_id
    }

    pub fn entity(&self) -> MetricEntity {
        self.column.entity()
    }

    pub fn column(&self) -> MetricColumn {
        self.column
    }

    pub fn action(&self) -> MetricAction {
        self.action
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Record key; keeps every delta for one counter row on one partition.
    pub fn partition_key(&self) -> String {
        format!("{}:{}", self.entity(), self.metric_id)
    }

    /// Encodes the event as JSON.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::Serialization)
    }

    /// Decodes and validates an event.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(Error::Serialization)
    }
}

/// Flat on-the-wire shape. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEvent {
    #[serde(default)]
    event_id: Uuid,
    metric_id: i64,
    entity: MetricEntity,
    column: String,
    action: MetricAction,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<WireEvent> for MetricDeltaEvent {
    type Error = Error;

    fn try_from(wire: WireEvent) -> Result<Self> {
        let column = MetricColumn::parse(wire.entity, &wire.column)?;
        Ok(Self {
            event_id: wire.event_id,
            metric_id: wire.metric_id,
            column,
            action: wire.action,
            created_at: wire.created_at,
            source: wire.source,
            metadata: wire.metadata,
        })
    }
}

impl From<MetricDeltaEvent> for WireEvent {
    fn from(event: MetricDeltaEvent) -> Self {
        Self {
            event_id: event.event_id,
            metric_id: event.metric_id,
            entity: event.column.entity(),
            column: event.column.as_str().to_string(),
            action: event.action,
            created_at: event.created_at,
            source: event.source,
            metadata: event.metadata,
        }
    }
}
