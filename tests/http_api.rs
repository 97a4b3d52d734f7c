//! Router-level tests for the metrics query API.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crud_telemetry::{server, AppState, Layer, TelemetryConfig};

fn app_with(config: TelemetryConfig) -> (Arc<AppState>, Router) {
    let state = Arc::new(AppState::new(&config));
    let router = server::create_router(state.clone());
    (state, router)
}

fn seeded() -> (Arc<AppState>, Router) {
    let (state, router) = app_with(TelemetryConfig::default());
    let reg = &state.registry;
    reg.record_execution(Layer::Service, "createUser", 1200, true);
    reg.record_execution(Layer::Service, "createUser", 800, false);
    reg.record_execution(Layer::Repository, "findById", 20, true);
    reg.record_execution(Layer::Repository, "save", 300, true);
    (state, router)
}

async fn send(router: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn lists_all_metrics_slowest_first() {
    let (_, router) = seeded();
    let (status, body) = send(router, "GET", "/api/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["method_name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["SERVICE::createUser", "REPOSITORY::save", "REPOSITORY::findById"]
    );
    assert_eq!(body[0]["performance_level"], "CRITICAL");
    assert_eq!(body[0]["failure_rate"], 50.0);
    assert_eq!(body[2]["performance_level"], "FAST");
}

#[tokio::test]
async fn unknown_method_is_200_with_error_body() {
    let (_, router) = seeded();
    let (status, body) = send(router, "GET", "/api/metrics/method/SERVICE::ghost").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "error": "Method not found" }));
}

#[tokio::test]
async fn known_method_lookup() {
    let (_, router) = seeded();
    let (status, body) = send(router, "GET", "/api/metrics/method/REPOSITORY::save").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_calls"], 1);
    assert_eq!(body["average_time_ms"], 300);
    assert_eq!(body["performance_level"], "NORMAL");
}

#[tokio::test]
async fn summary_and_failures() {
    let (_, router) = seeded();
    let (_, summary) = send(router.clone(), "GET", "/api/metrics/summary").await;
    assert_eq!(summary["total_methods_monitored"], 3);
    assert_eq!(summary["total_calls"], 4);
    assert_eq!(summary["total_failures"], 1);
    // (1000 + 20 + 300) / 3, unweighted
    assert_eq!(summary["overall_average_time_ms"], 440.0);

    let (_, failures) = send(router, "GET", "/api/metrics/failures").await;
    assert_eq!(failures["total_failures"], 1);
    assert_eq!(failures["overall_failure_rate"], 25.0);
    assert_eq!(failures["methods"][0]["method_name"], "SERVICE::createUser");
}

#[tokio::test]
async fn slow_top_and_layer_filters() {
    let (_, router) = seeded();

    let (_, slow) = send(router.clone(), "GET", "/api/metrics/slow?threshold=100").await;
    assert_eq!(slow.as_array().unwrap().len(), 2);

    let (_, slow_default) = send(router.clone(), "GET", "/api/metrics/slow").await;
    assert!(slow_default.as_array().unwrap().is_empty());

    let (_, top) = send(router.clone(), "GET", "/api/metrics/top?limit=1").await;
    assert_eq!(top.as_array().unwrap().len(), 1);
    assert_eq!(top[0]["method_name"], "SERVICE::createUser");

    let (_, repo) = send(router, "GET", "/api/metrics/layer/repository").await;
    assert_eq!(repo.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn reset_clears_registry() {
    let (state, router) = seeded();
    let (status, _) = send(router.clone(), "POST", "/api/metrics/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.registry.is_empty());

    let (_, all) = send(router, "GET", "/api/metrics").await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn export_endpoint_writes_file() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, router) = app_with(TelemetryConfig {
        export_dir: tmp.path().join("logs"),
        ..TelemetryConfig::default()
    });
    state
        .registry
        .record_execution(Layer::Service, "createUser", 10, true);

    let (status, body) = send(router, "POST", "/api/metrics/export").await;

    assert_eq!(status, StatusCode::OK);
    let path = body["path"].as_str().unwrap();
    assert!(path.ends_with("-export.log"));
    assert!(std::path::Path::new(path).exists());
}

#[tokio::test]
async fn export_failure_is_500_not_a_crash() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("logs");
    std::fs::write(&blocker, b"occupied").unwrap();
    let (_, router) = app_with(TelemetryConfig {
        export_dir: blocker,
        ..TelemetryConfig::default()
    });

    let (status, body) = send(router, "POST", "/api/metrics/export").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], 500);
}

#[tokio::test]
async fn load_status_idle_and_bad_config_rejected() {
    let (_, router) = app_with(TelemetryConfig::default());
    let (_, status) = send(router.clone(), "GET", "/api/load/status").await;
    assert_eq!(status["running"], false);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/load/start")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"concurrency": 0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
