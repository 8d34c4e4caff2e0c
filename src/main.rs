//! hpa-exporter entry point

use std::sync::Arc;

use kube::Client;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hpa_exporter::config::{Config, LogFormat, LoggingTarget};
use hpa_exporter::controller::{AutoscalerSource, ConditionLogger, HpaMetrics, KubeSource, MetricsPoller};
use hpa_exporter::log_sink::{CloudWatchSink, ConditionSink, StdoutSink};
use hpa_exporter::rest_api::run_server;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args()?;
    init_tracing(config.log_format);

    info!(
        listen_address = %config.listen_address,
        api_version = ?config.api_version,
        "starting hpa-exporter"
    );

    let client = Client::try_default().await?;
    let source: Arc<dyn AutoscalerSource> = Arc::new(KubeSource::new(client, config.api_version));
    let metrics = Arc::new(HpaMetrics::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = MetricsPoller::new(source.clone(), metrics.clone(), config.metrics_interval);
    let poller_handle = tokio::spawn(poller.run(shutdown_rx.clone()));

    let logger_handle = match &config.condition_logging {
        Some(logging) => {
            let sink: Arc<dyn ConditionSink> = match logging.target {
                LoggingTarget::Stdout => Arc::new(StdoutSink),
                LoggingTarget::Cwlogs => {
                    Arc::new(CloudWatchSink::connect(&logging.log_group, &logging.log_stream).await?)
                }
            };
            let logger = ConditionLogger::new(source.clone(), sink, logging.interval);
            Some(tokio::spawn(logger.run(shutdown_rx.clone())))
        }
        None => None,
    };

    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    };

    run_server(config.listen_address, metrics, shutdown).await?;

    let _ = poller_handle.await;
    if let Some(handle) = logger_handle {
        let _ = handle.await;
    }

    info!("hpa-exporter stopped");
    Ok(())
}
