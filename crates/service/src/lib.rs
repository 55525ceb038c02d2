//! Reserved-stock service.
//!
//! Runs the reservation pipeline over JSON-lines topic files and exposes
//! health and Prometheus endpoints with structured logging (tracing).

pub mod config;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use bus::{JsonLinesSink, JsonLinesSource};
use metrics_exporter_prometheus::PrometheusHandle;
use pipeline::{PipelineStats, ReservationPipeline};
use tokio::fs::{File, OpenOptions};
use tokio::io::BufReader;
use tower_http::trace::TraceLayer;

use config::Config;

/// Creates the Axum router serving `/health` and `/metrics`.
pub fn create_app(stats: Arc<PipelineStats>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .with_state(stats)
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http())
}

/// Opens the topic files named by `config` and wires them into a pipeline.
///
/// Both input files must exist. The output file is created if missing and
/// appended to otherwise.
pub async fn build_pipeline(config: &Config) -> anyhow::Result<ReservationPipeline> {
    let orders_path = config.topic_path(&config.orders_topic);
    let shipments_path = config.topic_path(&config.shipments_topic);
    let output_path = config.topic_path(&config.reserved_stock_topic);

    let orders = File::open(&orders_path)
        .await
        .with_context(|| format!("failed to open {}", orders_path.display()))?;
    let shipments = File::open(&shipments_path)
        .await
        .with_context(|| format!("failed to open {}", shipments_path.display()))?;
    let output = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&output_path)
        .await
        .with_context(|| format!("failed to open {}", output_path.display()))?;

    tracing::info!(
        orders = %orders_path.display(),
        shipments = %shipments_path.display(),
        output = %output_path.display(),
        "topics opened"
    );

    Ok(ReservationPipeline::new(
        JsonLinesSource::new(config.orders_topic.clone(), BufReader::new(orders)),
        JsonLinesSource::new(config.shipments_topic.clone(), BufReader::new(shipments)),
        JsonLinesSink::new(output),
        config.pipeline(),
    ))
}
