//! Reserved-stock service entry point.

use anyhow::Context;
use pipeline::ShutdownTrigger;
use reserved_stock::config::{Config, LogFormat};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    // 3. Open topics and build the pipeline
    let pipeline = reserved_stock::build_pipeline(&config).await?;
    let app = reserved_stock::create_app(pipeline.stats(), metrics_handle);

    // 4. Start the health/metrics server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "serving health and metrics");

    let shutdown = ShutdownTrigger::new();
    let mut server_signal = shutdown.signal();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_signal.wait().await })
            .await
    });

    // 5. Run the pipeline until the sources end, a fatal error, or a signal
    let mut pipeline_task = tokio::spawn(pipeline.run(shutdown.signal()));
    let outcome = tokio::select! {
        () = shutdown_signal() => {
            shutdown.trigger();
            (&mut pipeline_task).await
        }
        joined = &mut pipeline_task => joined,
    };
    shutdown.trigger();

    server
        .await
        .context("server task panicked")?
        .context("server error")?;

    let snapshot = outcome
        .context("pipeline task panicked")?
        .context("reservation pipeline failed")?;
    tracing::info!(stats = %snapshot, "service shut down gracefully");
    Ok(())
}
