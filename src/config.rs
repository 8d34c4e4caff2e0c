//! Command-line and environment configuration

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::{Error, Result};

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9296";
pub const DEFAULT_METRICS_INTERVAL: u64 = 30;
pub const DEFAULT_LOGGING_INTERVAL: u64 = 60;
pub const DEFAULT_CW_LOG_GROUP: &str = "hpa-exporter";
pub const DEFAULT_CW_LOG_STREAM: &str = "condition-log";

/// Autoscaler API shape to list and normalize
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ApiVersion {
    /// `autoscaling/v1` plus the alpha metric/condition annotations
    V1,
    /// `autoscaling/v2` typed multi-metric objects
    V2,
}

/// Where condition records are written
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LoggingTarget {
    /// The process log stream
    Stdout,
    /// AWS CloudWatch Logs
    Cwlogs,
}

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Raw command-line arguments
#[derive(Parser, Debug)]
#[command(name = "hpa-exporter")]
#[command(about = "Export HorizontalPodAutoscaler status as Prometheus metrics", long_about = None)]
#[command(version)]
pub struct Args {
    /// The address to listen on for HTTP requests
    #[arg(long, env = "HPA_EXPORTER_LISTEN_ADDRESS", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,

    /// Interval in seconds between HPA status polls
    #[arg(long, env = "HPA_EXPORTER_METRICS_INTERVAL", default_value_t = DEFAULT_METRICS_INTERVAL)]
    pub metrics_interval: u64,

    /// Log HPA conditions on a separate interval
    #[arg(long, env = "HPA_EXPORTER_CONDITION_LOGGING")]
    pub condition_logging: bool,

    /// Interval in seconds between condition log records
    #[arg(long, env = "HPA_EXPORTER_LOGGING_INTERVAL", default_value_t = DEFAULT_LOGGING_INTERVAL)]
    pub logging_interval: u64,

    /// Where to write condition records
    #[arg(long, env = "HPA_EXPORTER_LOGGING_TO", value_enum, default_value = "stdout")]
    pub logging_to: LoggingTarget,

    /// Name of the CloudWatch Logs group
    #[arg(long, env = "HPA_EXPORTER_CW_LOG_GROUP", default_value = DEFAULT_CW_LOG_GROUP)]
    pub cw_log_group: String,

    /// Name of the CloudWatch Logs stream
    #[arg(long, env = "HPA_EXPORTER_CW_LOG_STREAM", default_value = DEFAULT_CW_LOG_STREAM)]
    pub cw_log_stream: String,

    /// Autoscaler API version to read
    #[arg(long, env = "HPA_EXPORTER_API_VERSION", value_enum, default_value = "v2")]
    pub api_version: ApiVersion,

    /// Format of the exporter's own logs
    #[arg(long, env = "HPA_EXPORTER_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Validated exporter configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub listen_address: SocketAddr,
    pub metrics_interval: Duration,
    pub condition_logging: Option<ConditionLoggingConfig>,
    pub api_version: ApiVersion,
    pub log_format: LogFormat,
}

/// Settings of the optional condition logger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionLoggingConfig {
    pub interval: Duration,
    pub target: LoggingTarget,
    pub log_group: String,
    pub log_stream: String,
}

fn interval(name: &str, seconds: u64) -> Result<Duration> {
    if seconds == 0 {
        return Err(Error::ConfigError(format!("{} must be greater than 0", name)));
    }
    Ok(Duration::from_secs(seconds))
}

impl TryFrom<Args> for Config {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        let listen_address = args.listen_address.parse().map_err(|e| {
            Error::ConfigError(format!(
                "invalid listen address {:?}: {}",
                args.listen_address, e
            ))
        })?;

        let condition_logging = if args.condition_logging {
            if args.logging_to == LoggingTarget::Cwlogs
                && (args.cw_log_group.is_empty() || args.cw_log_stream.is_empty())
            {
                return Err(Error::ConfigError(
                    "cw-log-group and cw-log-stream must not be empty when logging to cwlogs"
                        .to_string(),
                ));
            }
            Some(ConditionLoggingConfig {
                interval: interval("logging-interval", args.logging_interval)?,
                target: args.logging_to,
                log_group: args.cw_log_group,
                log_stream: args.cw_log_stream,
            })
        } else {
            None
        };

        Ok(Config {
            listen_address,
            metrics_interval: interval("metrics-interval", args.metrics_interval)?,
            condition_logging,
            api_version: args.api_version,
            log_format: args.log_format,
        })
    }
}

impl Config {
    /// Parse and validate the process arguments and environment.
    ///
    /// `--help`, `--version` and unparsable flags exit the process through
    /// clap; semantic validation failures are returned.
    pub fn from_args() -> Result<Self> {
        Args::parse().try_into()
    }
}
