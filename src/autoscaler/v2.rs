//! Normalizer for `autoscaling/v2` HorizontalPodAutoscalers

use chrono::SecondsFormat;
use k8s_openapi::api::autoscaling::v2::{
    HorizontalPodAutoscaler, HorizontalPodAutoscalerCondition, MetricSpec, MetricStatus,
    MetricTarget, MetricValueStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::ResourceExt;

use super::quantity::quantity_value;
use super::types::{
    AutoscalerConditions, AutoscalerSnapshot, Condition, MetricDescriptor, MetricKind, ScaleTarget,
};
use crate::error::{Error, Result};

fn value(quantity: Option<&Quantity>) -> Result<Option<f64>> {
    quantity.map(quantity_value).transpose()
}

/// The target and current sides of a v2 metric expose the same fields under
/// different types.
trait MetricValues {
    fn utilization(&self) -> Option<i32>;
    fn average(&self) -> Option<&Quantity>;
    fn total(&self) -> Option<&Quantity>;

    fn object_value(&self) -> Result<Option<f64>> {
        match value(self.total())? {
            Some(v) => Ok(Some(v)),
            None => value(self.average()),
        }
    }

    fn pods_value(&self) -> Result<Option<f64>> {
        value(self.average())
    }

    fn resource_value(&self) -> Result<Option<f64>> {
        match self.utilization() {
            Some(pct) => Ok(Some(pct as f64)),
            None => value(self.average()),
        }
    }

    fn external_value(&self) -> Result<Option<f64>> {
        match value(self.average())? {
            Some(v) => Ok(Some(v)),
            None => value(self.total()),
        }
    }
}

impl MetricValues for MetricTarget {
    fn utilization(&self) -> Option<i32> {
        self.average_utilization
    }

    fn average(&self) -> Option<&Quantity> {
        self.average_value.as_ref()
    }

    fn total(&self) -> Option<&Quantity> {
        self.value.as_ref()
    }
}

impl MetricValues for MetricValueStatus {
    fn utilization(&self) -> Option<i32> {
        self.average_utilization
    }

    fn average(&self) -> Option<&Quantity> {
        self.average_value.as_ref()
    }

    fn total(&self) -> Option<&Quantity> {
        self.value.as_ref()
    }
}

fn target_descriptor(metric: &MetricSpec) -> Result<Option<MetricDescriptor>> {
    let descriptor = match MetricKind::from_type(&metric.type_) {
        Some(MetricKind::Object) => match &metric.object {
            Some(o) => o.target.object_value()?.map(|v| {
                MetricDescriptor::object(
                    &o.described_object.kind,
                    &o.described_object.name,
                    &o.metric.name,
                    v,
                )
            }),
            None => None,
        },
        Some(MetricKind::Pods) => match &metric.pods {
            Some(p) => p
                .target
                .pods_value()?
                .map(|v| MetricDescriptor::pods(&p.metric.name, v)),
            None => None,
        },
        Some(MetricKind::Resource) => match &metric.resource {
            Some(r) => r
                .target
                .resource_value()?
                .map(|v| MetricDescriptor::resource(&r.name, v)),
            None => None,
        },
        Some(MetricKind::External) => match &metric.external {
            Some(e) => e
                .target
                .external_value()?
                .map(|v| MetricDescriptor::external(&e.metric.name, v)),
            None => None,
        },
        None => None,
    };
    Ok(descriptor)
}

fn current_descriptor(metric: &MetricStatus) -> Result<Option<MetricDescriptor>> {
    let descriptor = match MetricKind::from_type(&metric.type_) {
        Some(MetricKind::Object) => match &metric.object {
            Some(o) => o.current.object_value()?.map(|v| {
                MetricDescriptor::object(
                    &o.described_object.kind,
                    &o.described_object.name,
                    &o.metric.name,
                    v,
                )
            }),
            None => None,
        },
        Some(MetricKind::Pods) => match &metric.pods {
            Some(p) => p
                .current
                .pods_value()?
                .map(|v| MetricDescriptor::pods(&p.metric.name, v)),
            None => None,
        },
        Some(MetricKind::Resource) => match &metric.resource {
            Some(r) => r
                .current
                .resource_value()?
                .map(|v| MetricDescriptor::resource(&r.name, v)),
            None => None,
        },
        Some(MetricKind::External) => match &metric.external {
            Some(e) => e
                .current
                .external_value()?
                .map(|v| MetricDescriptor::external(&e.metric.name, v)),
            None => None,
        },
        None => None,
    };
    Ok(descriptor)
}

impl From<&HorizontalPodAutoscalerCondition> for Condition {
    fn from(c: &HorizontalPodAutoscalerCondition) -> Self {
        Self {
            type_: c.type_.clone(),
            status: c.status.clone(),
            last_transition_time: c
                .last_transition_time
                .as_ref()
                .map(|t| t.0.to_rfc3339_opts(SecondsFormat::Secs, true)),
            reason: c.reason.clone().unwrap_or_default(),
            message: c.message.clone().unwrap_or_default(),
        }
    }
}

impl AutoscalerConditions for HorizontalPodAutoscaler {
    fn autoscaler_conditions(&self) -> Result<Vec<Condition>> {
        Ok(self
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .into_iter()
            .flatten()
            .map(Condition::from)
            .collect())
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
        let status = hpa.status.as_ref();

        let target_metrics = spec
            .metrics
            .iter()
            .flatten()
            .filter_map(|m| target_descriptor(m).transpose())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| malformed(format!("target metrics: {}", e)))?;

        let current_metrics = status
            .and_then(|s| s.current_metrics.as_ref())
            .into_iter()
            .flatten()
            .filter_map(|m| current_descriptor(m).transpose())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| malformed(format!("current metrics: {}", e)))?;

        let conditions = hpa.autoscaler_conditions()?;

        Ok(AutoscalerSnapshot {
            scale_target: ScaleTarget {
                kind: spec.scale_target_ref.kind.clone(),
                name: spec.scale_target_ref.name.clone(),
                api_version: spec.scale_target_ref.api_version.clone().unwrap_or_default(),
            },
            current_replicas: status.and_then(|s| s.current_replicas),
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
