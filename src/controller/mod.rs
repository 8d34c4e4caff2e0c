//! Autoscaler polling and metric publication
//!
//! The metrics poller and the condition logger each run their own loop
//! against a shared [`AutoscalerSource`]. Both stop when the shutdown watch
//! channel flips.

mod condition_log;
pub mod metrics;
mod poller;
mod relabel;
mod source;

pub use condition_log::ConditionLogger;
pub use metrics::{HpaMetrics, HpaLabels, MetricLabels, ConditionLabels};
pub use poller::MetricsPoller;
pub use relabel::{ConditionRelabeler, EmittedCondition};
pub use source::{normalize_all, AutoscalerListing, AutoscalerSource, KubeSource, ListedAutoscaler};
