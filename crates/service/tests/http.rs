//! Integration tests for the reserved-stock service.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bus::{InMemorySink, InMemorySource, OutboundRecord, SourceRecord};
use metrics_exporter_prometheus::PrometheusHandle;
use pipeline::{PipelineConfig, PipelineStats, ReservationPipeline};
use reserved_stock::config::Config;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn get_json(app: axum::Router, uri: &str) -> serde_json::Value {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn record(key: &str, lines: &[(&str, i64)]) -> SourceRecord {
    let items: Vec<_> = lines
        .iter()
        .map(|(p, q)| serde_json::json!({"product": p, "quantity": q}))
        .collect();
    SourceRecord::json(key, &serde_json::json!({"lineItems": items})).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = reserved_stock::create_app(Arc::new(PipelineStats::new()), get_metrics_handle());

    let json = get_json(app, "/health").await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["deltas_published"], 0);
    assert_eq!(json["records_rejected"], 0);
    assert_eq!(json["deltas_undelivered"], 0);
}

#[tokio::test]
async fn test_health_reports_pipeline_progress() {
    let orders = InMemorySource::from_records(
        "orders",
        vec![record("O1", &[("A", 3), ("B", 1)]), record("O2", &[("A", 0)])],
    );
    let shipments = InMemorySource::from_records("shipments", vec![record("S1", &[("A", 2)])]);
    let pipeline =
        ReservationPipeline::new(orders, shipments, InMemorySink::new(), PipelineConfig::default());
    let stats = pipeline.stats();
    pipeline.run_to_completion().await.unwrap();

    let app = reserved_stock::create_app(stats, get_metrics_handle());
    let json = get_json(app, "/health").await;
    assert_eq!(json["deltas_published"], 3);
    assert_eq!(json["records_rejected"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = reserved_stock::create_app(Arc::new(PipelineStats::new()), get_metrics_handle());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = reserved_stock::create_app(Arc::new(PipelineStats::new()), get_metrics_handle());

    let response = app
        .oneshot(Request::builder().uri("/orders").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pipeline_over_topic_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("orders.jsonl"),
        concat!(
            r#"{"key":"O1","value":{"id":"O1","lineItems":[{"product":"ProductA","quantity":3},{"product":"ProductB","quantity":1}]}}"#,
            "\n",
            r#"{"key":"O2","value":{"lineItems":[{"product":"ProductA","quantity":-1}]}}"#,
            "\n",
        ),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("shipments.jsonl"),
        concat!(
            r#"{"key":"S1","value":{"lineItems":[{"product":"ProductA","quantity":2}]}}"#,
            "\n",
        ),
    )
    .unwrap();

    let config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let pipeline = reserved_stock::build_pipeline(&config).await.unwrap();
    let snapshot = pipeline.run_to_completion().await.unwrap();

    assert_eq!(snapshot.deltas_published(), 3);
    assert_eq!(snapshot.orders_rejected, 1);

    let output = std::fs::read_to_string(dir.path().join("reserved-stock.jsonl")).unwrap();
    let mut deltas: Vec<(String, i64)> = output
        .lines()
        .map(|line| {
            let record: OutboundRecord = serde_json::from_str(line).unwrap();
            (record.key, record.value)
        })
        .collect();
    deltas.sort();
    assert_eq!(
        deltas,
        vec![
            ("ProductA".to_string(), -2),
            ("ProductA".to_string(), 3),
            ("ProductB".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn test_output_topic_is_appended() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("orders.jsonl"), "").unwrap();
    std::fs::write(
        dir.path().join("shipments.jsonl"),
        r#"{"key":"S1","value":{"lineItems":[{"product":"ProductA","quantity":4}]}}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("reserved-stock.jsonl"),
        "{\"key\":\"ProductA\",\"value\":4}\n",
    )
    .unwrap();

    let config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let pipeline = reserved_stock::build_pipeline(&config).await.unwrap();
    pipeline.run_to_completion().await.unwrap();

    let output = std::fs::read_to_string(dir.path().join("reserved-stock.jsonl")).unwrap();
    assert_eq!(
        output.lines().collect::<Vec<_>>(),
        vec![
            r#"{"key":"ProductA","value":4}"#,
            r#"{"key":"ProductA","value":-4}"#,
        ]
    );
}

#[tokio::test]
async fn test_missing_input_topic_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("orders.jsonl"), "").unwrap();

    let config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let err = reserved_stock::build_pipeline(&config).await.err().unwrap();
    assert!(err.to_string().contains("shipments.jsonl"));
}
