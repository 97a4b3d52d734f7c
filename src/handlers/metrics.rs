use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::query::{FailureStatistics, MethodLookup, MethodMetricsView, MetricsSummary};
use crate::AppState;

use super::{ActionStatus, AppError};

// ─── Query parameters ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ThresholdParams {
    /// Average duration (ms) an operation must exceed to be listed
    #[serde(default = "default_threshold")]
    pub threshold: u64,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_threshold() -> u64 {
    1000
}
fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct ExportStatus {
    pub message: String,
    pub path: String,
}

// ─── GET /api/metrics ────────────────────────────────────────────

pub async fn all_metrics(State(state): State<Arc<AppState>>) -> Json<Vec<MethodMetricsView>> {
    Json(state.query.get_all_metrics_formatted())
}

// ─── GET /api/metrics/summary ────────────────────────────────────

pub async fn summary(State(state): State<Arc<AppState>>) -> Json<MetricsSummary> {
    Json(state.query.get_metrics_summary())
}

// ─── GET /api/metrics/method/:key ────────────────────────────────
/// Unknown keys answer 200 with `{"error": "Method not found"}`.

pub async fn method_metrics(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Json<MethodLookup> {
    Json(state.query.get_method_metrics_formatted(&key))
}

// ─── GET /api/metrics/slow?threshold=N ───────────────────────────

pub async fn slow_methods(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ThresholdParams>,
) -> Json<Vec<MethodMetricsView>> {
    Json(state.query.get_slow_methods(params.threshold))
}

// ─── GET /api/metrics/top?limit=N ────────────────────────────────

pub async fn top_slow_methods(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<MethodMetricsView>> {
    Json(state.query.get_top_slow_methods(params.limit))
}

// ─── GET /api/metrics/layer/:layer ───────────────────────────────

pub async fn metrics_by_layer(
    State(state): State<Arc<AppState>>,
    Path(layer): Path<String>,
) -> Json<Vec<MethodMetricsView>> {
    Json(state.query.get_metrics_by_layer(&layer))
}

// ─── GET /api/metrics/failures ───────────────────────────────────

pub async fn failure_statistics(State(state): State<Arc<AppState>>) -> Json<FailureStatistics> {
    Json(state.query.get_failure_statistics())
}

// ─── POST /api/metrics/reset ─────────────────────────────────────

pub async fn reset_metrics(State(state): State<Arc<AppState>>) -> Json<ActionStatus> {
    state.query.reset_metrics();
    Json(ActionStatus {
        message: "Metrics reset".into(),
    })
}

// ─── POST /api/metrics/export ────────────────────────────────────
/// File I/O runs on the blocking pool, never on a request worker.

pub async fn export_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExportStatus>, AppError> {
    let query = state.query.clone();
    let written = tokio::task::spawn_blocking(move || query.export_performance_summary())
        .await
        .map_err(|e| AppError::Internal(format!("export task failed: {e}")))?;

    match written {
        Some(path) => Ok(Json(ExportStatus {
            message: "Performance summary exported".into(),
            path: path.display().to_string(),
        })),
        None => Err(AppError::Internal(
            "Failed to export performance summary".into(),
        )),
    }
}
