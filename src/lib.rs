//! Prometheus exporter for Kubernetes HorizontalPodAutoscalers
//!
//! Periodically lists every autoscaler in the cluster, publishes its replica
//! counts, metric values and conditions as gauges, and optionally ships the
//! raw conditions to a log sink.

pub mod autoscaler;
pub mod config;
pub mod controller;
pub mod error;
pub mod log_sink;
pub mod rest_api;

pub use error::{Error, Result};
