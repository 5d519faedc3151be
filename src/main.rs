use anyhow::Context;
use bolt_sink::metrics::{start_metrics_server, MetricsConfig};
use bolt_sink::sink::{Sink, SinkConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SinkConfig::from_env().context("invalid sink configuration")?;

    if let Some(addr) = config.metrics_addr {
        start_metrics_server(MetricsConfig::with_addr(addr))
            .context("failed to start metrics exporter")?;
    }

    tracing::info!(
        sink = %format!("{}:{}", config.sink_host, config.sink_port),
        server = %format!("{}:{}", config.server_host, config.server_port),
        backend = %format!("{}:{}", config.backend_host, config.backend_port),
        "starting bolt sink"
    );

    let (sink, router) = Sink::graphite_relay(config).await;
    sink.start().await.context("failed to start sink")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!(
        messages = router.store().len(),
        tallied = router.tally().len(),
        "shutting down"
    );
    sink.stop().await;
    router.close().await;

    Ok(())
}
