//! Metrics poll loop
//!
//! On every tick the poller lists all autoscalers, publishes their base,
//! metric and condition series, and deletes the series of autoscalers (or
//! individual metrics) that are no longer observed. A failed fetch leaves the
//! registry exactly as it was, and so does a malformed autoscaler for its own
//! series.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use prometheus_client::metrics::family::Family;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use super::metrics::{set, FloatGauge, HpaLabels, HpaMetrics, MetricLabels};
use super::relabel::ConditionRelabeler;
use super::source::{AutoscalerListing, AutoscalerSource, ListedAutoscaler};
use crate::autoscaler::{AutoscalerKey, AutoscalerSnapshot};
use crate::error::Result;

/// Series published for one autoscaler on the previous tick
#[derive(Debug, Clone)]
struct PublishedSeries {
    base: HpaLabels,
    target_metrics: HashSet<MetricLabels>,
    current_metrics: HashSet<MetricLabels>,
}

/// Owns the condition cache and drives the metrics tick
pub struct MetricsPoller {
    source: Arc<dyn AutoscalerSource>,
    metrics: Arc<HpaMetrics>,
    interval: Duration,
    relabeler: ConditionRelabeler,
    published: HashMap<AutoscalerKey, PublishedSeries>,
}

impl MetricsPoller {
    pub fn new(source: Arc<dyn AutoscalerSource>, metrics: Arc<HpaMetrics>, interval: Duration) -> Self {
        Self {
            source,
            metrics,
            interval,
            relabeler: ConditionRelabeler::new(),
            published: HashMap::new(),
        }
    }

    /// Poll until the shutdown signal fires. The first tick runs immediately.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "metrics poller started");

        loop {
            if let Err(e) = self.tick().await {
                error!("Failed to list autoscalers: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("metrics poller shutting down");
                    break;
                }
            }
        }
    }

    /// Fetch once and publish. Returns the number of autoscalers published.
    #[instrument(skip(self))]
    pub async fn tick(&mut self) -> Result<usize> {
        let listing = self.source.list_autoscalers().await?;
        self.publish(&listing);
        Ok(listing.snapshots().count())
    }

    /// Publish one complete listing.
    ///
    /// Malformed autoscalers keep whatever they published on earlier ticks.
    pub fn publish(&mut self, listing: &AutoscalerListing) {
        let mut seen = HashSet::with_capacity(listing.len());
        for item in &listing.items {
            let key = item.key();
            match item {
                ListedAutoscaler::Normalized(snapshot) => self.publish_one(&key, snapshot),
                ListedAutoscaler::Malformed { .. } => {
                    debug!(autoscaler = %key, "keeping previous series of malformed autoscaler");
                }
            }
            seen.insert(key);
        }

        let vanished: Vec<AutoscalerKey> = self
            .published
            .keys()
            .chain(self.relabeler.tracked())
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        for key in vanished {
            debug!(autoscaler = %key, "autoscaler disappeared, deleting its series");
            self.forget(&key);
        }
    }

    fn publish_one(&mut self, key: &AutoscalerKey, snapshot: &AutoscalerSnapshot) {
        let metrics = self.metrics.as_ref();
        let base = HpaLabels::from(snapshot);

        let previous = self.published.remove(key);
        if let Some(previous) = &previous {
            if previous.base != base {
                // the scale target changed, so every base-labelled series moved
                for family in metrics.base_families() {
                    family.remove(&previous.base);
                }
            }
        }

        set_or_remove(&metrics.current_pods, &base, snapshot.current_replicas.map(f64::from));
        set_or_remove(&metrics.desired_pods, &base, snapshot.desired_replicas.map(f64::from));
        set_or_remove(&metrics.min_pods, &base, snapshot.min_replicas.map(f64::from));
        set(&metrics.max_pods, &base, f64::from(snapshot.max_replicas));
        set_or_remove(
            &metrics.last_scale_second,
            &base,
            snapshot.last_scale_time.map(|t| t as f64),
        );

        let mut target_metrics = HashSet::new();
        for metric in &snapshot.target_metrics {
            let labels = MetricLabels::new(&base, metric);
            set(&metrics.target_metric_value, &labels, metric.value);
            target_metrics.insert(labels);
        }
        let mut current_metrics = HashSet::new();
        for metric in &snapshot.current_metrics {
            let labels = MetricLabels::new(&base, metric);
            set(&metrics.current_metric_value, &labels, metric.value);
            current_metrics.insert(labels);
        }
        if let Some(previous) = previous {
            for stale in previous.target_metrics.difference(&target_metrics) {
                metrics.target_metric_value.remove(stale);
            }
            for stale in previous.current_metrics.difference(&current_metrics) {
                metrics.current_metric_value.remove(stale);
            }
        }

        for condition in &snapshot.conditions {
            self.relabeler.relabel(metrics, key, &base, condition);
        }

        self.published.insert(
            key.clone(),
            PublishedSeries {
                base,
                target_metrics,
                current_metrics,
            },
        );
    }

    fn forget(&mut self, key: &AutoscalerKey) {
        let metrics = self.metrics.as_ref();
        if let Some(previous) = self.published.remove(key) {
            for family in metrics.base_families() {
                family.remove(&previous.base);
            }
            for labels in &previous.target_metrics {
                metrics.target_metric_value.remove(labels);
            }
            for labels in &previous.current_metrics {
                metrics.current_metric_value.remove(labels);
            }
        }
        self.relabeler.forget(metrics, key);
    }
}

/// Set the series, or delete it when the field was not reported
fn set_or_remove(family: &Family<HpaLabels, FloatGauge>, labels: &HpaLabels, value: Option<f64>) {
    match value {
        Some(v) => set(family, labels, v),
        None => {
            family.remove(labels);
        }
    }
}
