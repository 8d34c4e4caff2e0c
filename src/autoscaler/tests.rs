//! Unit tests for autoscaler normalization
//!
//! Feeds `autoscaling/v1` and `autoscaling/v2` objects, as the API server
//! returns them, through the normalizers and checks the resulting snapshots.

#[cfg(test)]
mod v1_normalization {
    use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscaler;
    use serde_json::json;

    use crate::autoscaler::{AutoscalerSnapshot, MetricDescriptor, MetricKind};
    use crate::error::Error;

    fn hpa(value: serde_json::Value) -> HorizontalPodAutoscaler {
        serde_json::from_value(value).expect("valid v1 HPA")
    }

    fn base(annotations: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "autoscaling/v1",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {
                "name": "web",
                "namespace": "default",
                "annotations": annotations
            },
            "spec": {
                "scaleTargetRef": {
                    "apiVersion": "apps/v1",
                    "kind": "Deployment",
                    "name": "web"
                },
                "minReplicas": 2,
                "maxReplicas": 10,
                "targetCPUUtilizationPercentage": 80
            },
            "status": {
                "currentReplicas": 3,
                "desiredReplicas": 5,
                "currentCPUUtilizationPercentage": 72,
                "lastScaleTime": "2024-01-02T03:04:05Z"
            }
        })
    }

    #[test]
    fn test_plain_v1_fields() {
        let snapshot = AutoscalerSnapshot::try_from(&hpa(base(json!({})))).unwrap();

        assert_eq!(snapshot.name, "web");
        assert_eq!(snapshot.namespace, "default");
        assert_eq!(snapshot.scale_target.kind, "Deployment");
        assert_eq!(snapshot.scale_target.api_version, "apps/v1");
        assert_eq!(snapshot.current_replicas, Some(3));
        assert_eq!(snapshot.desired_replicas, Some(5));
        assert_eq!(snapshot.min_replicas, Some(2));
        assert_eq!(snapshot.max_replicas, 10);
        assert_eq!(snapshot.last_scale_time, Some(1_704_164_645));
        assert_eq!(
            snapshot.target_metrics,
            vec![MetricDescriptor::resource("cpu", 80.0)]
        );
        assert_eq!(
            snapshot.current_metrics,
            vec![MetricDescriptor::resource("cpu", 72.0)]
        );
        assert!(snapshot.conditions.is_empty());
    }

    #[test]
    fn test_metric_annotations_take_precedence() {
        let metrics = json!([
            {"type": "Resource", "resource": {"name": "cpu", "targetAverageUtilization": 80}},
            {"type": "Object", "object": {
                "target": {"kind": "Service", "name": "frontend", "apiVersion": "v1"},
                "metricName": "requests-per-second",
                "targetValue": "2500m"
            }},
            {"type": "Pods", "pods": {"metricName": "packets", "targetAverageValue": "1k"}},
            {"type": "External", "external": {"metricName": "queue_depth", "targetValue": "30"}}
        ]);
        let current = json!([
            {"type": "Resource", "resource": {"name": "memory", "currentAverageValue": "128Mi"}},
            {"type": "External", "external": {
                "metricName": "queue_depth",
                "currentValue": "40",
                "currentAverageValue": "500m"
            }}
        ]);
        let snapshot = AutoscalerSnapshot::try_from(&hpa(base(json!({
            "autoscaling.alpha.kubernetes.io/metrics": metrics.to_string(),
            "autoscaling.alpha.kubernetes.io/current-metrics": current.to_string(),
        }))))
        .unwrap();

        assert_eq!(
            snapshot.target_metrics,
            vec![
                MetricDescriptor::resource("cpu", 80.0),
                MetricDescriptor::object("Service", "frontend", "requests-per-second", 2.5),
                MetricDescriptor::pods("packets", 1000.0),
                MetricDescriptor::external("queue_depth", 30.0),
            ]
        );
        assert_eq!(snapshot.target_metrics[0].metric_name, "-");
        assert_eq!(
            snapshot.current_metrics,
            vec![
                MetricDescriptor::resource("memory", 134_217_728.0),
                MetricDescriptor::external("queue_depth", 0.5),
            ]
        );
    }

    #[test]
    fn test_unknown_metric_kind_is_dropped() {
        let metrics = json!([
            {"type": "ContainerResource", "containerResource": {"name": "cpu", "container": "app"}},
            {"type": "Pods", "pods": {"metricName": "packets", "targetAverageValue": "10"}}
        ]);
        let snapshot = AutoscalerSnapshot::try_from(&hpa(base(json!({
            "autoscaling.alpha.kubernetes.io/metrics": metrics.to_string(),
        }))))
        .unwrap();

        assert_eq!(snapshot.target_metrics.len(), 1);
        assert_eq!(snapshot.target_metrics[0].kind, MetricKind::Pods);
    }

    #[test]
    fn test_conditions_annotation() {
        let conditions = json!([
            {
                "type": "AbleToScale",
                "status": "True",
                "lastTransitionTime": "2024-01-02T03:04:05Z",
                "reason": "ReadyForNewScale",
                "message": "recommended size matches current size"
            },
            {"type": "ScalingActive", "status": "False", "reason": "FailedGetResourceMetric"}
        ]);
        let snapshot = AutoscalerSnapshot::try_from(&hpa(base(json!({
            "autoscaling.alpha.kubernetes.io/conditions": conditions.to_string(),
        }))))
        .unwrap();

        assert_eq!(snapshot.conditions.len(), 2);
        assert_eq!(snapshot.conditions[0].reason, "ReadyForNewScale");
        assert_eq!(snapshot.conditions[1].status, "False");
        assert_eq!(snapshot.conditions[1].message, "");
    }

    #[test]
    fn test_malformed_annotation_rejects_autoscaler() {
        let result = AutoscalerSnapshot::try_from(&hpa(base(json!({
            "autoscaling.alpha.kubernetes.io/conditions": "[{not json",
        }))));

        match result {
            Err(err @ Error::MalformedAutoscaler { .. }) => assert!(err.is_per_entity()),
            other => panic!("expected malformed autoscaler, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_quantity_rejects_autoscaler() {
        let current = json!([
            {"type": "Pods", "pods": {"metricName": "packets", "currentAverageValue": "lots"}}
        ]);
        let result = AutoscalerSnapshot::try_from(&hpa(base(json!({
            "autoscaling.alpha.kubernetes.io/current-metrics": current.to_string(),
        }))));

        assert!(matches!(result, Err(Error::MalformedAutoscaler { .. })));
    }

    #[test]
    fn test_missing_optional_fields() {
        let snapshot = AutoscalerSnapshot::try_from(&hpa(json!({
            "apiVersion": "autoscaling/v1",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {"name": "worker", "namespace": "jobs"},
            "spec": {
                "scaleTargetRef": {"kind": "Deployment", "name": "worker"},
                "maxReplicas": 4
            }
        })))
        .unwrap();

        assert_eq!(snapshot.min_replicas, None);
        assert_eq!(snapshot.current_replicas, None);
        assert_eq!(snapshot.last_scale_time, None);
        assert_eq!(snapshot.scale_target.api_version, "");
        assert!(snapshot.target_metrics.is_empty());
        assert!(snapshot.current_metrics.is_empty());
    }
}

#[cfg(test)]
mod v2_normalization {
    use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
    use serde_json::json;

    use crate::autoscaler::{AutoscalerSnapshot, MetricDescriptor};
    use crate::error::Error;

    fn hpa(value: serde_json::Value) -> HorizontalPodAutoscaler {
        serde_json::from_value(value).expect("valid v2 HPA")
    }

    fn web() -> serde_json::Value {
        json!({
            "apiVersion": "autoscaling/v2",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "scaleTargetRef": {"apiVersion": "apps/v1", "kind": "Deployment", "name": "web"},
                "minReplicas": 2,
                "maxReplicas": 10,
                "metrics": [
                    {"type": "Resource", "resource": {
                        "name": "cpu",
                        "target": {"type": "Utilization", "averageUtilization": 80}
                    }},
                    {"type": "Object", "object": {
                        "describedObject": {"apiVersion": "networking.k8s.io/v1", "kind": "Ingress", "name": "main"},
                        "metric": {"name": "requests-per-second"},
                        "target": {"type": "Value", "value": "2500m"}
                    }},
                    {"type": "Pods", "pods": {
                        "metric": {"name": "packets"},
                        "target": {"type": "AverageValue", "averageValue": "1k"}
                    }},
                    {"type": "External", "external": {
                        "metric": {"name": "queue_depth"},
                        "target": {"type": "Value", "value": "30"}
                    }},
                    {"type": "ContainerResource", "containerResource": {
                        "name": "cpu",
                        "container": "app",
                        "target": {"type": "Utilization", "averageUtilization": 60}
                    }}
                ]
            },
            "status": {
                "currentReplicas": 3,
                "desiredReplicas": 5,
                "lastScaleTime": "2024-01-02T03:04:05Z",
                "currentMetrics": [
                    {"type": "Resource", "resource": {
                        "name": "cpu",
                        "current": {"averageUtilization": 72, "averageValue": "310m"}
                    }},
                    {"type": "External", "external": {
                        "metric": {"name": "queue_depth"},
                        "current": {"value": "40", "averageValue": "8"}
                    }}
                ],
                "conditions": [
                    {
                        "type": "AbleToScale",
                        "status": "True",
                        "lastTransitionTime": "2024-01-02T03:04:05Z",
                        "reason": "ReadyForNewScale",
                        "message": "recommended size matches current size"
                    },
                    {"type": "ScalingLimited", "status": "Unknown"}
                ]
            }
        })
    }

    #[test]
    fn test_typed_metrics() {
        let snapshot = AutoscalerSnapshot::try_from(&hpa(web())).unwrap();

        assert_eq!(
            snapshot.target_metrics,
            vec![
                MetricDescriptor::resource("cpu", 80.0),
                MetricDescriptor::object("Ingress", "main", "requests-per-second", 2.5),
                MetricDescriptor::pods("packets", 1000.0),
                MetricDescriptor::external("queue_depth", 30.0),
            ]
        );
        assert_eq!(
            snapshot.current_metrics,
            vec![
                MetricDescriptor::resource("cpu", 72.0),
                MetricDescriptor::external("queue_depth", 8.0),
            ]
        );
    }

    #[test]
    fn test_replicas_and_conditions() {
        let snapshot = AutoscalerSnapshot::try_from(&hpa(web())).unwrap();

        assert_eq!(snapshot.current_replicas, Some(3));
        assert_eq!(snapshot.desired_replicas, Some(5));
        assert_eq!(snapshot.min_replicas, Some(2));
        assert_eq!(snapshot.max_replicas, 10);
        assert_eq!(snapshot.last_scale_time, Some(1_704_164_645));

        assert_eq!(snapshot.conditions.len(), 2);
        assert_eq!(
            snapshot.conditions[0].last_transition_time.as_deref(),
            Some("2024-01-02T03:04:05Z")
        );
        assert_eq!(snapshot.conditions[1].reason, "");
        assert_eq!(snapshot.conditions[1].reversed_status(), "True");
    }

    #[test]
    fn test_new_autoscaler_without_status() {
        let mut value = web();
        value.as_object_mut().unwrap().remove("status");
        let snapshot = AutoscalerSnapshot::try_from(&hpa(value)).unwrap();

        assert_eq!(snapshot.current_replicas, None);
        assert_eq!(snapshot.desired_replicas, None);
        assert_eq!(snapshot.last_scale_time, None);
        assert!(snapshot.current_metrics.is_empty());
        assert!(snapshot.conditions.is_empty());
        assert_eq!(snapshot.target_metrics.len(), 4);
    }

    #[test]
    fn test_bad_quantity_rejects_autoscaler() {
        let mut value = web();
        value["spec"]["metrics"][2]["pods"]["target"]["averageValue"] = json!("1.2.3");
        let result = AutoscalerSnapshot::try_from(&hpa(value));

        assert!(matches!(result, Err(Error::MalformedAutoscaler { .. })));
    }
}
