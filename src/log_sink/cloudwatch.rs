//! Condition records shipped to AWS CloudWatch Logs
//!
//! The log group is provisioned once at startup; failing to do so is fatal.
//! The stream is looked up before every batch to obtain its upload sequence
//! token, and created when it does not exist yet.

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use aws_sdk_cloudwatchlogs::Client;
use tracing::{debug, info, instrument};

use super::{ConditionRecord, ConditionSink};
use crate::error::{Error, Result};

fn sink_error(context: &str, err: impl std::error::Error) -> Error {
    Error::LogSinkError(format!("{}: {}", context, DisplayErrorContext(err)))
}

/// Writes one `PutLogEvents` batch per logging tick
pub struct CloudWatchSink {
    client: Client,
    log_group: String,
    log_stream: String,
}

impl CloudWatchSink {
    /// Load AWS credentials from the environment/shared config and make sure
    /// the log group exists
    pub async fn connect(log_group: &str, log_stream: &str) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let sink = Self {
            client: Client::new(&config),
            log_group: log_group.to_string(),
            log_stream: log_stream.to_string(),
        };
        sink.ensure_log_group().await?;
        Ok(sink)
    }

    #[instrument(skip(self), fields(log_group = %self.log_group))]
    async fn ensure_log_group(&self) -> Result<()> {
        let groups = self
            .client
            .describe_log_groups()
            .log_group_name_prefix(&self.log_group)
            .send()
            .await
            .map_err(|e| sink_error("describe log groups", e))?;

        let exists = groups
            .log_groups()
            .iter()
            .any(|g| g.log_group_name() == Some(self.log_group.as_str()));
        if exists {
            debug!("log group exists");
            return Ok(());
        }

        self.client
            .create_log_group()
            .log_group_name(&self.log_group)
            .send()
            .await
            .map_err(|e| sink_error("create log group", e))?;
        info!("created CloudWatch log group");
        Ok(())
    }

    /// Upload sequence token of the stream, creating the stream if missing
    async fn sequence_token(&self) -> Result<Option<String>> {
        let streams = self
            .client
            .describe_log_streams()
            .log_group_name(&self.log_group)
            .log_stream_name_prefix(&self.log_stream)
            .send()
            .await
            .map_err(|e| sink_error("describe log streams", e))?;

        if let Some(stream) = streams
            .log_streams()
            .iter()
            .find(|s| s.log_stream_name() == Some(self.log_stream.as_str()))
        {
            return Ok(stream.upload_sequence_token().map(String::from));
        }

        self.client
            .create_log_stream()
            .log_group_name(&self.log_group)
            .log_stream_name(&self.log_stream)
            .send()
            .await
            .map_err(|e| sink_error("create log stream", e))?;
        info!(log_stream = %self.log_stream, "created CloudWatch log stream");
        Ok(None)
    }
}

/// Build the events of one batch, all stamped with the same time
pub fn log_events(records: &[ConditionRecord], timestamp_ms: i64) -> Result<Vec<InputLogEvent>> {
    records
        .iter()
        .map(|record| -> Result<InputLogEvent> {
            InputLogEvent::builder()
                .message(record.to_json()?)
                .timestamp(timestamp_ms)
                .build()
                .map_err(|e| sink_error("build log event", e))
        })
        .collect()
}

#[async_trait]
impl ConditionSink for CloudWatchSink {
    #[instrument(skip(self, records), fields(log_group = %self.log_group, log_stream = %self.log_stream))]
    async fn publish(&self, records: &[ConditionRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("no condition records to ship");
            return Ok(());
        }

        let events = log_events(records, chrono::Utc::now().timestamp_millis())?;
        let token = self.sequence_token().await?;

        self.client
            .put_log_events()
            .log_group_name(&self.log_group)
            .log_stream_name(&self.log_stream)
            .set_sequence_token(token)
            .set_log_events(Some(events))
            .send()
            .await
            .map_err(|e| sink_error("put log events", e))?;

        debug!(count = records.len(), "shipped condition records");
        Ok(())
    }
}
