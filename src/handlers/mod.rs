pub mod load;
pub mod metrics;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// ─── Shared response bodies ──────────────────────────────────────

/// Acknowledgement for control endpoints (reset, load start/stop).
#[derive(Debug, Clone, Serialize)]
pub struct ActionStatus {
    pub message: String,
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
    #[error("Load generator already running")]
    AlreadyRunning,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AlreadyRunning => StatusCode::CONFLICT,
        };

        let body = serde_json::json!({
            "error":  self.to_string(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
