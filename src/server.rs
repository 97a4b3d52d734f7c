use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::AppState;

/// Builds the full Axum `Router` with the query API and load controls.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Metrics queries ─────────────────────────────────────
        .route("/api/metrics", get(handlers::metrics::all_metrics))
        .route("/api/metrics/summary", get(handlers::metrics::summary))
        .route(
            "/api/metrics/method/:key",
            get(handlers::metrics::method_metrics),
        )
        .route("/api/metrics/slow", get(handlers::metrics::slow_methods))
        .route("/api/metrics/top", get(handlers::metrics::top_slow_methods))
        .route(
            "/api/metrics/layer/:layer",
            get(handlers::metrics::metrics_by_layer),
        )
        .route(
            "/api/metrics/failures",
            get(handlers::metrics::failure_statistics),
        )
        .route("/api/metrics/stream", get(stream::metrics_stream))
        // ── Metrics control ─────────────────────────────────────
        .route("/api/metrics/reset", post(handlers::metrics::reset_metrics))
        .route("/api/metrics/export", post(handlers::metrics::export_summary))
        // ── Synthetic workload ──────────────────────────────────
        .route("/api/load/start", post(handlers::load::start_load))
        .route("/api/load/stop", post(handlers::load::stop_load))
        .route("/api/load/status", get(handlers::load::load_status))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
