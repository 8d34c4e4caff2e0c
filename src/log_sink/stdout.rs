//! Condition records written to the process log stream

use async_trait::async_trait;
use tracing::info;

use super::{ConditionRecord, ConditionSink};
use crate::error::Result;

/// Emits one `info` event per autoscaler on the `hpa_conditions` target
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl ConditionSink for StdoutSink {
    async fn publish(&self, records: &[ConditionRecord]) -> Result<()> {
        for record in records {
            info!(target: "hpa_conditions", "{}", record.to_json()?);
        }
        Ok(())
    }
}
