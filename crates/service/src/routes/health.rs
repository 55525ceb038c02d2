//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use pipeline::PipelineStats;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub deltas_published: u64,
    pub records_rejected: u64,
    pub deltas_undelivered: u64,
}

/// GET /health — returns liveness plus pipeline progress.
pub async fn check(State(stats): State<Arc<PipelineStats>>) -> Json<HealthResponse> {
    let snapshot = stats.snapshot();
    Json(HealthResponse {
        status: "ok",
        deltas_published: snapshot.deltas_published(),
        records_rejected: snapshot.records_rejected(),
        deltas_undelivered: snapshot.deltas_undelivered(),
    })
}
