//! Generic metric service.
//!
//! One implementation serves every countable entity; the column type fixes
//! the entity, so a user service cannot emit a post column.

use pipeline_core::{EntityColumn, Error, MetricAction, MetricDeltaEvent, MetricEntity, Result};
use redpanda::MetricPublisher;
use std::marker::PhantomData;
use telemetry::metrics;
use tracing::{error, warn};

/// Requests counter deltas for one entity.
pub struct MetricService<C> {
    publisher: MetricPublisher,
    topic: String,
    _column: PhantomData<fn() -> C>,
}

impl<C> Clone for MetricService<C> {
    fn clone(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
            topic: self.topic.clone(),
            _column: PhantomData,
        }
    }
}

impl<C: EntityColumn> MetricService<C> {
    pub fn new(publisher: MetricPublisher, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            _column: PhantomData,
        }
    }

    pub fn entity(&self) -> MetricEntity {
        C::ENTITY
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Builds and publishes one delta. Returns the published event.
    pub async fn request(
        &self,
        metric_id: i64,
        column: C,
        action: MetricAction,
        source: &str,
    ) -> Result<MetricDeltaEvent> {
        let event = MetricDeltaEvent::new(metric_id, column, action, source);
        self.publisher.publish(&event, &self.topic).await?;
        Ok(event)
    }

    /// Like [`request`](Self::request) for a column given by name.
    ///
    /// A name outside this entity's set fails with `InvalidColumn` and is
    /// never published.
    pub async fn request_named(
        &self,
        metric_id: i64,
        column: &str,
        action: MetricAction,
        source: &str,
    ) -> Result<MetricDeltaEvent> {
        let Some(column) = C::parse(column) else {
            metrics().invalid_columns.inc();
            error!(
                entity = %C::ENTITY,
                column,
                source,
                "Rejected metric request for unknown column"
            );
            return Err(Error::invalid_column(C::ENTITY.as_str(), column));
        };

        self.request(metric_id, column, action, source).await
    }

    pub async fn increment(&self, metric_id: i64, column: C, source: &str) -> Result<MetricDeltaEvent> {
        self.request(metric_id, column, MetricAction::Sum, source).await
    }

    pub async fn decrement(&self, metric_id: i64, column: C, source: &str) -> Result<MetricDeltaEvent> {
        self.request(metric_id, column, MetricAction::Red, source).await
    }

    /// Publishes a delta on behalf of a write path that must not fail because
    /// of it. Returns whether the delta was queued.
    pub async fn record(&self, metric_id: i64, column: C, action: MetricAction, source: &str) -> bool {
        match self.request(metric_id, column, action, source).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    entity = %C::ENTITY,
                    column = column.as_str(),
                    metric_id,
                    source,
                    error = %e,
                    "Counter update dropped, counter will be stale"
                );
                false
            }
        }
    }
}
