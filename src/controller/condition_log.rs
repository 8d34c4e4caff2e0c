//! Condition logging loop
//!
//! Runs independently of the metrics poller with its own interval and fetch.
//! An autoscaler whose metrics are malformed is still logged as long as its
//! conditions decode.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::source::{AutoscalerSource, ListedAutoscaler};
use crate::error::Result;
use crate::log_sink::{ConditionRecord, ConditionSink};

pub struct ConditionLogger {
    source: Arc<dyn AutoscalerSource>,
    sink: Arc<dyn ConditionSink>,
    interval: Duration,
}

impl ConditionLogger {
    pub fn new(source: Arc<dyn AutoscalerSource>, sink: Arc<dyn ConditionSink>, interval: Duration) -> Self {
        Self {
            source,
            sink,
            interval,
        }
    }

    /// Log until the shutdown signal fires. The first tick runs immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "condition logger started");

        loop {
            if let Err(e) = self.tick().await {
                error!("Condition logging failed: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("condition logger shutting down");
                    break;
                }
            }
        }
    }

    /// Fetch once and hand every autoscaler's conditions to the sink
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<usize> {
        let listing = self.source.list_autoscalers().await?;
        let records: Vec<ConditionRecord> =
            listing.items.iter().filter_map(condition_record).collect();
        self.sink.publish(&records).await?;
        Ok(records.len())
    }
}

fn condition_record(item: &ListedAutoscaler) -> Option<ConditionRecord> {
    match item {
        ListedAutoscaler::Normalized(snapshot) => Some(ConditionRecord::from(snapshot)),
        ListedAutoscaler::Malformed { key, conditions } => {
            conditions.as_ref().map(|conditions| ConditionRecord {
                name: key.name.clone(),
                conditions: conditions.clone(),
            })
        }
    }
}
