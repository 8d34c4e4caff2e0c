//! Destinations for autoscaler condition records

pub mod cloudwatch;
pub mod stdout;

use async_trait::async_trait;
use serde::Serialize;

use crate::autoscaler::{AutoscalerSnapshot, Condition};
use crate::error::Result;

pub use cloudwatch::CloudWatchSink;
pub use stdout::StdoutSink;

/// One line of the condition log: `{"name": ..., "conditions": [...]}`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ConditionRecord {
    pub name: String,
    pub conditions: Vec<Condition>,
}

impl From<&AutoscalerSnapshot> for ConditionRecord {
    fn from(snapshot: &AutoscalerSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            conditions: snapshot.conditions.clone(),
        }
    }
}

impl ConditionRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[async_trait]
pub trait ConditionSink: Send + Sync {
    /// Write the records of one logging tick
    async fn publish(&self, records: &[ConditionRecord]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let record = ConditionRecord {
            name: "web".to_string(),
            conditions: vec![Condition {
                type_: "AbleToScale".to_string(),
                status: "True".to_string(),
                last_transition_time: Some("2024-01-02T03:04:05Z".to_string()),
                reason: "ReadyForNewScale".to_string(),
                message: "recommended size matches current size".to_string(),
            }],
        };

        assert_eq!(
            record.to_json().unwrap(),
            r#"{"name":"web","conditions":[{"type":"AbleToScale","status":"True","lastTransitionTime":"2024-01-02T03:04:05Z","reason":"ReadyForNewScale","message":"recommended size matches current size"}]}"#
        );
    }

    #[test]
    fn test_record_without_conditions() {
        let record = ConditionRecord {
            name: "idle".to_string(),
            conditions: vec![],
        };
        assert_eq!(record.to_json().unwrap(), r#"{"name":"idle","conditions":[]}"#);
    }
}
