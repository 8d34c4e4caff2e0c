//! Normalizer for `autoscaling/v1` HorizontalPodAutoscalers
//!
//! The v1 API only carries a CPU utilization target. Multi-metric specs,
//! current metric values and conditions are stored by the API server in
//! alpha annotations using the `autoscaling/v2beta1` JSON shape, which is
//! parsed here.

use std::collections::BTreeMap;

use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscaler;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::quantity::parse_quantity;
use super::types::{
    AutoscalerConditions, AutoscalerSnapshot, Condition, MetricDescriptor, MetricKind, ScaleTarget,
};
use crate::error::{Error, Result};

/// Annotation holding the `v2beta1` metric specs
pub const METRICS_ANNOTATION: &str = "autoscaling.alpha.kubernetes.io/metrics";
/// Annotation holding the `v2beta1` current metric statuses
pub const CURRENT_METRICS_ANNOTATION: &str = "autoscaling.alpha.kubernetes.io/current-metrics";
/// Annotation holding the autoscaler conditions
pub const CONDITIONS_ANNOTATION: &str = "autoscaling.alpha.kubernetes.io/conditions";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectReference {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMetricSpec {
    #[serde(rename = "type")]
    type_: String,
    object: Option<LegacyObjectSpec>,
    pods: Option<LegacyPodsSpec>,
    resource: Option<LegacyResourceSpec>,
    external: Option<LegacyExternalSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyObjectSpec {
    #[serde(default)]
    target: ObjectReference,
    metric_name: String,
    target_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPodsSpec {
    metric_name: String,
    target_average_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyResourceSpec {
    name: String,
    target_average_utilization: Option<i32>,
    target_average_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyExternalSpec {
    metric_name: String,
    target_value: Option<String>,
    target_average_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMetricStatus {
    #[serde(rename = "type")]
    type_: String,
    object: Option<LegacyObjectStatus>,
    pods: Option<LegacyPodsStatus>,
    resource: Option<LegacyResourceStatus>,
    external: Option<LegacyExternalStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyObjectStatus {
    #[serde(default)]
    target: ObjectReference,
    metric_name: String,
    current_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPodsStatus {
    metric_name: String,
    current_average_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyResourceStatus {
    name: String,
    current_average_utilization: Option<i32>,
    current_average_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyExternalStatus {
    metric_name: String,
    current_value: Option<String>,
    current_average_value: Option<String>,
}

fn quantity(raw: Option<&String>) -> Result<Option<f64>> {
    raw.map(|q| parse_quantity(q)).transpose()
}

impl LegacyMetricSpec {
    fn descriptor(&self) -> Result<Option<MetricDescriptor>> {
        let descriptor = match MetricKind::from_type(&self.type_) {
            Some(MetricKind::Object) => match &self.object {
                Some(o) => quantity(o.target_value.as_ref())?.map(|v| {
                    MetricDescriptor::object(&o.target.kind, &o.target.name, &o.metric_name, v)
                }),
                None => None,
            },
            Some(MetricKind::Pods) => match &self.pods {
                Some(p) => quantity(p.target_average_value.as_ref())?
                    .map(|v| MetricDescriptor::pods(&p.metric_name, v)),
                None => None,
            },
            Some(MetricKind::Resource) => match &self.resource {
                Some(r) => match r.target_average_utilization {
                    Some(pct) => Some(pct as f64),
                    None => quantity(r.target_average_value.as_ref())?,
                }
                .map(|v| MetricDescriptor::resource(&r.name, v)),
                None => None,
            },
            Some(MetricKind::External) => match &self.external {
                Some(e) => match quantity(e.target_average_value.as_ref())? {
                    Some(v) => Some(v),
                    None => quantity(e.target_value.as_ref())?,
                }
                .map(|v| MetricDescriptor::external(&e.metric_name, v)),
                None => None,
            },
            None => None,
        };
        Ok(descriptor)
    }
}

impl LegacyMetricStatus {
    fn descriptor(&self) -> Result<Option<MetricDescriptor>> {
        let descriptor = match MetricKind::from_type(&self.type_) {
            Some(MetricKind::Object) => match &self.object {
                Some(o) => quantity(o.current_value.as_ref())?.map(|v| {
                    MetricDescriptor::object(&o.target.kind, &o.target.name, &o.metric_name, v)
                }),
                None => None,
            },
            Some(MetricKind::Pods) => match &self.pods {
                Some(p) => quantity(p.current_average_value.as_ref())?
                    .map(|v| MetricDescriptor::pods(&p.metric_name, v)),
                None => None,
            },
            Some(MetricKind::Resource) => match &self.resource {
                Some(r) => match r.current_average_utilization {
                    Some(pct) => Some(pct as f64),
                    None => quantity(r.current_average_value.as_ref())?,
                }
                .map(|v| MetricDescriptor::resource(&r.name, v)),
                None => None,
            },
            Some(MetricKind::External) => match &self.external {
                Some(e) => match quantity(e.current_average_value.as_ref())? {
                    Some(v) => Some(v),
                    None => quantity(e.current_value.as_ref())?,
                }
                .map(|v| MetricDescriptor::external(&e.metric_name, v)),
                None => None,
            },
            None => None,
        };
        Ok(descriptor)
    }
}

/// Decode a JSON annotation; a missing or blank annotation is `None`
fn annotation<T: DeserializeOwned>(
    annotations: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>> {
    match annotations.get(key).map(|raw| raw.trim()) {
        Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(raw)?)),
        _ => Ok(None),
    }
}

impl AutoscalerConditions for HorizontalPodAutoscaler {
    fn autoscaler_conditions(&self) -> Result<Vec<Condition>> {
        let conditions: Option<Vec<Condition>> = annotation(self.annotations(), CONDITIONS_ANNOTATION)?;
        Ok(conditions.unwrap_or_default())
    }
}

impl TryFrom<&HorizontalPodAutoscaler> for AutoscalerSnapshot {
    type Error = Error;

    fn try_from(hpa: &HorizontalPodAutoscaler) -> Result<Self> {
        let name = hpa.name_any();
        let namespace = hpa.namespace().unwrap_or_default();
        let malformed = |reason: String| Error::MalformedAutoscaler {
            namespace: namespace.clone(),
            name: name.clone(),
            reason,
        };

        let spec = hpa
            .spec
            .as_ref()
            .ok_or_else(|| malformed("missing spec".to_string()))?;
        let annotations = hpa.annotations();

        let metric_specs: Option<Vec<LegacyMetricSpec>> = annotation(annotations, METRICS_ANNOTATION)
            .map_err(|e| malformed(format!("{}: {}", METRICS_ANNOTATION, e)))?;
        let target_metrics = match metric_specs {
            Some(specs) => specs
                .iter()
                .filter_map(|s| s.descriptor().transpose())
                .collect::<Result<Vec<_>>>()
                .map_err(|e| malformed(format!("{}: {}", METRICS_ANNOTATION, e)))?,
            None => spec
                .target_cpu_utilization_percentage
                .map(|pct| MetricDescriptor::resource("cpu", pct as f64))
                .into_iter()
                .collect(),
        };

        let metric_statuses: Option<Vec<LegacyMetricStatus>> =
            annotation(annotations, CURRENT_METRICS_ANNOTATION)
                .map_err(|e| malformed(format!("{}: {}", CURRENT_METRICS_ANNOTATION, e)))?;
        let status = hpa.status.as_ref();
        let current_metrics = match metric_statuses {
            Some(statuses) => statuses
                .iter()
                .filter_map(|s| s.descriptor().transpose())
                .collect::<Result<Vec<_>>>()
                .map_err(|e| malformed(format!("{}: {}", CURRENT_METRICS_ANNOTATION, e)))?,
            None => status
                .and_then(|s| s.current_cpu_utilization_percentage)
                .map(|pct| MetricDescriptor::resource("cpu", pct as f64))
                .into_iter()
                .collect(),
        };

        let conditions = hpa
            .autoscaler_conditions()
            .map_err(|e| malformed(format!("{}: {}", CONDITIONS_ANNOTATION, e)))?;

        Ok(AutoscalerSnapshot {
            scale_target: ScaleTarget {
                kind: spec.scale_target_ref.kind.clone(),
                name: spec.scale_target_ref.name.clone(),
                api_version: spec.scale_target_ref.api_version.clone().unwrap_or_default(),
            },
            current_replicas: status.map(|s| s.current_replicas),
            desired_replicas: status.map(|s| s.desired_replicas),
            min_replicas: spec.min_replicas,
            max_replicas: spec.max_replicas,
            last_scale_time: status
                .and_then(|s| s.last_scale_time.as_ref())
                .map(|t| t.0.timestamp()),
            target_metrics,
            current_metrics,
            conditions,
            name,
            namespace,
        })
    }
}
