//! Condition relabeling
//!
//! Every published condition type has two series per autoscaler: the
//! *active* one carrying the observed status, reason and message (value 1)
//! and the *inactive* one carrying the reversed status with empty reason and
//! message (value 0). When the reason, message or status changes between
//! polls, the previously emitted pair is deleted before the new pair is set,
//! otherwise the old combination would stay at 1 forever.

use std::collections::HashMap;

use tracing::debug;

use super::metrics::{set, ConditionLabels, HpaLabels, HpaMetrics};
use crate::autoscaler::{AutoscalerKey, Condition, ConditionType};

/// The label sets last written for one (autoscaler, condition type)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedCondition {
    pub active: ConditionLabels,
    pub inactive: ConditionLabels,
}

impl EmittedCondition {
    /// Build the active/inactive pair for an observed condition
    pub fn new(base: &HpaLabels, condition: &Condition) -> Self {
        Self {
            active: ConditionLabels::new(
                base,
                &condition.status,
                &condition.reason,
                &condition.message,
            ),
            inactive: ConditionLabels::new(base, condition.reversed_status(), "", ""),
        }
    }
}

/// Cache of emitted condition label sets, owned by the metrics poller
#[derive(Debug, Default)]
pub struct ConditionRelabeler {
    emitted: HashMap<AutoscalerKey, HashMap<ConditionType, EmittedCondition>>,
}

impl ConditionRelabeler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published series for one observed condition.
    ///
    /// Conditions of a type that is not published are ignored.
    pub fn relabel(
        &mut self,
        metrics: &HpaMetrics,
        key: &AutoscalerKey,
        base: &HpaLabels,
        condition: &Condition,
    ) {
        let Some(condition_type) = condition.condition_type() else {
            debug!(autoscaler = %key, type_ = %condition.type_, "ignoring condition type");
            return;
        };
        let family = metrics.condition_family(condition_type);
        let next = EmittedCondition::new(base, condition);

        let by_type = self.emitted.entry(key.clone()).or_default();
        if let Some(previous) = by_type.get(&condition_type) {
            family.remove(&previous.active);
            family.remove(&previous.inactive);
        }

        set(family, &next.active, 1.0);
        set(family, &next.inactive, 0.0);
        by_type.insert(condition_type, next);
    }

    /// Delete every condition series of an autoscaler and drop its cache entry
    pub fn forget(&mut self, metrics: &HpaMetrics, key: &AutoscalerKey) {
        if let Some(by_type) = self.emitted.remove(key) {
            for (condition_type, emitted) in by_type {
                let family = metrics.condition_family(condition_type);
                family.remove(&emitted.active);
                family.remove(&emitted.inactive);
            }
        }
    }

    /// Last emitted pair for an autoscaler and condition type
    #[cfg(test)]
    pub(crate) fn emitted(&self, key: &AutoscalerKey, condition_type: ConditionType) -> Option<&EmittedCondition> {
        self.emitted.get(key).and_then(|m| m.get(&condition_type))
    }

    /// Autoscalers with at least one cached condition
    pub fn tracked(&self) -> impl Iterator<Item = &AutoscalerKey> {
        self.emitted.keys()
    }
}
