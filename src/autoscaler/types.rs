//! Version-independent view of a HorizontalPodAutoscaler
//!
//! Both the `autoscaling/v1` and `autoscaling/v2` shapes are normalized into
//! these types before anything is published.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Status value the orchestrator uses for a condition that holds
pub const CONDITION_STATUS_TRUE: &str = "True";
/// Status value the orchestrator uses for a condition that does not hold
pub const CONDITION_STATUS_FALSE: &str = "False";

/// Placeholder used for label values that have no meaning for a metric kind
pub const NO_VALUE: &str = "-";

/// The workload an autoscaler scales
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScaleTarget {
    pub kind: String,
    pub name: String,
    pub api_version: String,
}

/// Metric source kinds understood by the exporter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// A metric describing a single Kubernetes object
    Object,
    /// A metric averaged across the scale target's pods
    Pods,
    /// A built-in resource metric (cpu, memory)
    Resource,
    /// A metric from outside the cluster
    External,
}

impl MetricKind {
    /// Parse the `type` discriminator of a metric spec/status.
    ///
    /// Returns `None` for kinds the exporter does not publish, such as
    /// `ContainerResource`.
    pub fn from_type(type_: &str) -> Option<Self> {
        match type_ {
            "Object" => Some(MetricKind::Object),
            "Pods" => Some(MetricKind::Pods),
            "Resource" => Some(MetricKind::Resource),
            "External" => Some(MetricKind::External),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Object => "Object",
            MetricKind::Pods => "Pods",
            MetricKind::Resource => "Resource",
            MetricKind::External => "External",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One target or current metric value of an autoscaler
#[derive(Clone, Debug, PartialEq)]
pub struct MetricDescriptor {
    pub kind: MetricKind,
    /// Kind of the object the metric refers to, synthetic for non-Object kinds
    pub reference_kind: String,
    /// Name of the referenced object or resource, `-` when not applicable
    pub reference_name: String,
    /// Metric name, `-` for Resource metrics
    pub metric_name: String,
    pub value: f64,
}

impl MetricDescriptor {
    pub fn object(reference_kind: &str, reference_name: &str, metric_name: &str, value: f64) -> Self {
        Self {
            kind: MetricKind::Object,
            reference_kind: reference_kind.to_string(),
            reference_name: reference_name.to_string(),
            metric_name: metric_name.to_string(),
            value,
        }
    }

    pub fn pods(metric_name: &str, value: f64) -> Self {
        Self {
            kind: MetricKind::Pods,
            reference_kind: "Pod".to_string(),
            reference_name: NO_VALUE.to_string(),
            metric_name: metric_name.to_string(),
            value,
        }
    }

    pub fn resource(resource_name: &str, value: f64) -> Self {
        Self {
            kind: MetricKind::Resource,
            reference_kind: "Resource".to_string(),
            reference_name: resource_name.to_string(),
            metric_name: NO_VALUE.to_string(),
            value,
        }
    }

    pub fn external(metric_name: &str, value: f64) -> Self {
        Self {
            kind: MetricKind::External,
            reference_kind: "External".to_string(),
            reference_name: NO_VALUE.to_string(),
            metric_name: metric_name.to_string(),
            value,
        }
    }
}

/// Condition types that are published as boolean gauges
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConditionType {
    AbleToScale,
    ScalingActive,
    ScalingLimited,
}

impl ConditionType {
    pub const ALL: [ConditionType; 3] = [
        ConditionType::AbleToScale,
        ConditionType::ScalingActive,
        ConditionType::ScalingLimited,
    ];

    pub fn from_type(type_: &str) -> Option<Self> {
        match type_ {
            "AbleToScale" => Some(ConditionType::AbleToScale),
            "ScalingActive" => Some(ConditionType::ScalingActive),
            "ScalingLimited" => Some(ConditionType::ScalingLimited),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::AbleToScale => "AbleToScale",
            ConditionType::ScalingActive => "ScalingActive",
            ConditionType::ScalingLimited => "ScalingLimited",
        }
    }
}

/// Autoscaler condition (Kubernetes convention)
///
/// Serialized as-is into condition log records.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., "AbleToScale", "ScalingLimited")
    #[serde(rename = "type")]
    pub type_: String,
    /// Status of the condition: "True", "False", or "Unknown"
    pub status: String,
    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason for the condition
    #[serde(default)]
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

impl Condition {
    /// The published condition type, `None` for types the exporter ignores
    pub fn condition_type(&self) -> Option<ConditionType> {
        ConditionType::from_type(&self.type_)
    }

    /// Status used for the inactive series of this condition.
    ///
    /// Only `"True"` negates to `"False"`; every other value, `"Unknown"`
    /// included, negates to `"True"`.
    pub fn reversed_status(&self) -> &'static str {
        if self.status == CONDITION_STATUS_TRUE {
            CONDITION_STATUS_FALSE
        } else {
            CONDITION_STATUS_TRUE
        }
    }
}

/// Read only the conditions of a raw autoscaler object.
///
/// Succeeds whenever the conditions themselves decode, even if the metric
/// payload of the same object is malformed.
pub trait AutoscalerConditions {
    fn autoscaler_conditions(&self) -> Result<Vec<Condition>>;
}

/// One autoscaler as observed on a single poll tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoscalerSnapshot {
    pub name: String,
    pub namespace: String,
    pub scale_target: ScaleTarget,
    pub current_replicas: Option<i32>,
    pub desired_replicas: Option<i32>,
    pub min_replicas: Option<i32>,
    pub max_replicas: i32,
    /// Unix seconds of the last scale operation
    pub last_scale_time: Option<i64>,
    pub target_metrics: Vec<MetricDescriptor>,
    pub current_metrics: Vec<MetricDescriptor>,
    pub conditions: Vec<Condition>,
}

impl AutoscalerSnapshot {
    /// Identity of the autoscaler across ticks
    pub fn key(&self) -> AutoscalerKey {
        AutoscalerKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// Namespace-qualified autoscaler name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AutoscalerKey {
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for AutoscalerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
