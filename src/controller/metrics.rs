//! Prometheus metrics for HorizontalPodAutoscalers
//!
//! All gauge families live in one owned [`HpaMetrics`] registry that is shared
//! between the poll loop (writer) and the `/metrics` handler (reader).
//! `Family` synchronizes internally, so no extra locking is needed.

use std::sync::atomic::AtomicU64;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::autoscaler::{AutoscalerSnapshot, ConditionType, MetricDescriptor};
use crate::error::Result;

/// Floating point gauge
pub type FloatGauge = Gauge<f64, AtomicU64>;

/// Labels identifying one autoscaler
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HpaLabels {
    pub hpa_name: String,
    pub hpa_namespace: String,
    pub ref_kind: String,
    pub ref_name: String,
    pub ref_apiversion: String,
}

impl From<&AutoscalerSnapshot> for HpaLabels {
    fn from(snapshot: &AutoscalerSnapshot) -> Self {
        Self {
            hpa_name: snapshot.name.clone(),
            hpa_namespace: snapshot.namespace.clone(),
            ref_kind: snapshot.scale_target.kind.clone(),
            ref_name: snapshot.scale_target.name.clone(),
            ref_apiversion: snapshot.scale_target.api_version.clone(),
        }
    }
}

/// Labels for target and current metric values
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MetricLabels {
    pub hpa_name: String,
    pub hpa_namespace: String,
    pub ref_kind: String,
    pub ref_name: String,
    pub ref_apiversion: String,
    pub metric_kind: String,
    pub metric_ref_kind: String,
    pub metric_ref_name: String,
    pub metric_name: String,
}

impl MetricLabels {
    pub fn new(base: &HpaLabels, metric: &MetricDescriptor) -> Self {
        Self {
            hpa_name: base.hpa_name.clone(),
            hpa_namespace: base.hpa_namespace.clone(),
            ref_kind: base.ref_kind.clone(),
            ref_name: base.ref_name.clone(),
            ref_apiversion: base.ref_apiversion.clone(),
            metric_kind: metric.kind.to_string(),
            metric_ref_kind: metric.reference_kind.clone(),
            metric_ref_name: metric.reference_name.clone(),
            metric_name: metric.metric_name.clone(),
        }
    }
}

/// Labels for condition gauges
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ConditionLabels {
    pub hpa_name: String,
    pub hpa_namespace: String,
    pub ref_kind: String,
    pub ref_name: String,
    pub ref_apiversion: String,
    pub cond_status: String,
    pub cond_reason: String,
    pub cond_message: String,
}

impl ConditionLabels {
    pub fn new(base: &HpaLabels, status: &str, reason: &str, message: &str) -> Self {
        Self {
            hpa_name: base.hpa_name.clone(),
            hpa_namespace: base.hpa_namespace.clone(),
            ref_kind: base.ref_kind.clone(),
            ref_name: base.ref_name.clone(),
            ref_apiversion: base.ref_apiversion.clone(),
            cond_status: status.to_string(),
            cond_reason: reason.to_string(),
            cond_message: message.to_string(),
        }
    }
}

/// Owned registry with every HPA gauge family
pub struct HpaMetrics {
    registry: Registry,
    pub current_pods: Family<HpaLabels, FloatGauge>,
    pub desired_pods: Family<HpaLabels, FloatGauge>,
    pub min_pods: Family<HpaLabels, FloatGauge>,
    pub max_pods: Family<HpaLabels, FloatGauge>,
    pub last_scale_second: Family<HpaLabels, FloatGauge>,
    pub current_metric_value: Family<MetricLabels, FloatGauge>,
    pub target_metric_value: Family<MetricLabels, FloatGauge>,
    pub able_to_scale: Family<ConditionLabels, FloatGauge>,
    pub scaling_active: Family<ConditionLabels, FloatGauge>,
    pub scaling_limited: Family<ConditionLabels, FloatGauge>,
}

impl std::fmt::Debug for HpaMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpaMetrics").finish_non_exhaustive()
    }
}

impl Default for HpaMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HpaMetrics {
    /// Create the families and register them
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let current_pods = Family::<HpaLabels, FloatGauge>::default();
        registry.register(
            "hpa_current_pods_num",
            "Number of current pods by status",
            current_pods.clone(),
        );
        let desired_pods = Family::<HpaLabels, FloatGauge>::default();
        registry.register(
            "hpa_desired_pods_num",
            "Number of desired pods by status",
            desired_pods.clone(),
        );
        let min_pods = Family::<HpaLabels, FloatGauge>::default();
        registry.register(
            "hpa_min_pods_num",
            "Number of min pods by spec",
            min_pods.clone(),
        );
        let max_pods = Family::<HpaLabels, FloatGauge>::default();
        registry.register(
            "hpa_max_pods_num",
            "Number of max pods by spec",
            max_pods.clone(),
        );
        let last_scale_second = Family::<HpaLabels, FloatGauge>::default();
        registry.register(
            "hpa_last_scale_second",
            "Time the scale was last executed, in unix seconds",
            last_scale_second.clone(),
        );
        let current_metric_value = Family::<MetricLabels, FloatGauge>::default();
        registry.register(
            "hpa_current_metric_value",
            "Current value of each metric observed by the HPA",
            current_metric_value.clone(),
        );
        let target_metric_value = Family::<MetricLabels, FloatGauge>::default();
        registry.register(
            "hpa_target_metric_value",
            "Target value of each metric in the HPA spec",
            target_metric_value.clone(),
        );
        let able_to_scale = Family::<ConditionLabels, FloatGauge>::default();
        registry.register(
            "hpa_able_to_scale",
            "AbleToScale condition of the HPA",
            able_to_scale.clone(),
        );
        let scaling_active = Family::<ConditionLabels, FloatGauge>::default();
        registry.register(
            "hpa_scaling_active",
            "ScalingActive condition of the HPA",
            scaling_active.clone(),
        );
        let scaling_limited = Family::<ConditionLabels, FloatGauge>::default();
        registry.register(
            "hpa_scaling_limited",
            "ScalingLimited condition of the HPA",
            scaling_limited.clone(),
        );

        Self {
            registry,
            current_pods,
            desired_pods,
            min_pods,
            max_pods,
            last_scale_second,
            current_metric_value,
            target_metric_value,
            able_to_scale,
            scaling_active,
            scaling_limited,
        }
    }

    /// Gauge family backing a condition type
    pub fn condition_family(&self, condition: ConditionType) -> &Family<ConditionLabels, FloatGauge> {
        match condition {
            ConditionType::AbleToScale => &self.able_to_scale,
            ConditionType::ScalingActive => &self.scaling_active,
            ConditionType::ScalingLimited => &self.scaling_limited,
        }
    }

    /// The base families keyed only by autoscaler labels
    pub fn base_families(&self) -> [&Family<HpaLabels, FloatGauge>; 5] {
        [
            &self.current_pods,
            &self.desired_pods,
            &self.min_pods,
            &self.max_pods,
            &self.last_scale_second,
        ]
    }

    /// Drop every series from every family
    pub fn reset(&self) {
        for family in self.base_families() {
            family.clear();
        }
        self.current_metric_value.clear();
        self.target_metric_value.clear();
        for condition in ConditionType::ALL {
            self.condition_family(condition).clear();
        }
    }

    /// Render the registry in the OpenMetrics text format
    pub fn encode(&self) -> Result<String> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }

    /// Sorted sample lines of one family, without HELP/TYPE comments
    pub fn samples(&self, family: &str) -> Result<Vec<String>> {
        let encoded = self.encode()?;
        let prefix = format!("{}{{", family);
        let mut samples: Vec<String> = encoded
            .lines()
            .filter(|l| l.starts_with(&prefix))
            .map(String::from)
            .collect();
        samples.sort();
        Ok(samples)
    }
}

/// Numeric value of an encoded sample line
#[cfg(test)]
pub(crate) fn sample_value(sample: &str) -> f64 {
    sample
        .rsplit(' ')
        .next()
        .and_then(|v| v.parse().ok())
        .expect("sample line ends with a number")
}

/// Set a series, creating it on first use
pub fn set<S>(family: &Family<S, FloatGauge>, labels: &S, value: f64)
where
    S: Clone + std::hash::Hash + Eq,
{
    family.get_or_create(labels).set(value);
}
