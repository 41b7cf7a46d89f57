//! Unified error types for the metric pipeline.
//!
//! Error codes:
//! - METRIC_001-003: Caller errors (bad entity/column pairing, bad payloads)
//! - BROKER_001-004: Broker connectivity and provisioning errors
//! - INTERNAL_001: Anything else

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// How an error should be treated by the surrounding process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Aborts process startup.
    FatalStartup,
    /// A single topic failed; provisioning continues.
    Provisioning,
    /// Programming error at the call site; raised before anything is sent.
    Caller,
    /// Publish-time failure; the write path decides whether staleness is acceptable.
    Runtime,
}

/// Unified error type for the metric pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("[METRIC_001] column '{column}' is not valid for {entity}")]
    InvalidColumn { entity: String, column: String },

    #[error("[METRIC_002] unknown metric entity: {0}")]
    UnknownEntity(String),

    #[error("[METRIC_003] serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("[BROKER_001] invalid broker address: {0}")]
    InvalidBrokerAddress(String),

    #[error("[BROKER_002] broker unreachable after {attempts} attempts: {last_error}")]
    ConnectionExhausted { attempts: u32, last_error: String },

    #[error("[BROKER_003] broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("[BROKER_004] topic configuration error: {0}")]
    TopicConfig(String),

    #[error("[INTERNAL_001] internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_column(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::InvalidColumn {
            entity: entity.into(),
            column: column.into(),
        }
    }

    pub fn broker_unavailable(msg: impl Into<String>) -> Self {
        Self::BrokerUnavailable(msg.into())
    }

    pub fn topic_config(msg: impl Into<String>) -> Self {
        Self::TopicConfig(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidColumn { .. } => "METRIC_001",
            Self::UnknownEntity(_) => "METRIC_002",
            Self::Serialization(_) => "METRIC_003",
            Self::InvalidBrokerAddress(_) => "BROKER_001",
            Self::ConnectionExhausted { .. } => "BROKER_002",
            Self::BrokerUnavailable(_) => "BROKER_003",
            Self::TopicConfig(_) => "BROKER_004",
            Self::Internal(_) => "INTERNAL_001",
        }
    }

    /// Classify the error for the caller.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidBrokerAddress(_) | Self::ConnectionExhausted { .. } => {
                ErrorClass::FatalStartup
            }
            Self::TopicConfig(_) => ErrorClass::Provisioning,
            Self::InvalidColumn { .. } | Self::UnknownEntity(_) | Self::Serialization(_) => {
                ErrorClass::Caller
            }
            Self::BrokerUnavailable(_) | Self::Internal(_) => ErrorClass::Runtime,
        }
    }

    /// Returns true if the error must abort startup.
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::FatalStartup
    }
}
