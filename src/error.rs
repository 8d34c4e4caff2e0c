//! Central error types for the HPA exporter
//!
//! Uses `thiserror` for ergonomic, type-safe error handling with
//! automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Central error type for the HPA exporter
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error from kube-rs
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A Kubernetes quantity string could not be parsed
    #[error("Invalid quantity: {0:?}")]
    InvalidQuantity(String),

    /// A single autoscaler carried a payload that could not be normalized
    #[error("Malformed autoscaler {namespace}/{name}: {reason}")]
    MalformedAutoscaler {
        namespace: String,
        name: String,
        reason: String,
    },

    /// Remote log sink (CloudWatch Logs) error
    #[error("Log sink error: {0}")]
    LogSinkError(String),

    /// Metrics encoding failure
    #[error("Metrics encoding error: {0}")]
    EncodingError(#[from] std::fmt::Error),

    /// HTTP server bind or serve failure
    #[error("Server error: {0}")]
    ServerError(String),
}

/// Result type alias for exporter operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Errors that only affect one autoscaler and must not abort a poll tick
    pub fn is_per_entity(&self) -> bool {
        matches!(
            self,
            Error::MalformedAutoscaler { .. }
                | Error::InvalidQuantity(_)
                | Error::SerializationError(_)
        )
    }
}
