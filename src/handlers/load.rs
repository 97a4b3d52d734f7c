use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Number of concurrent Tokio tasks issuing wrapped calls
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the workload runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Percentage of calls that fail (0–100)
    #[serde(default = "default_failure_pct")]
    pub failure_pct: u8,
}

fn default_concurrency() -> u32 {
    10
}
fn default_duration() -> u64 {
    30
}
fn default_failure_pct() -> u8 {
    5
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 || self.concurrency > 500 {
            return Err(AppError::BadRequest(
                "concurrency must be between 1 and 500".into(),
            ));
        }
        if self.duration_secs == 0 || self.duration_secs > 300 {
            return Err(AppError::BadRequest(
                "duration_secs must be between 1 and 300".into(),
            ));
        }
        if self.failure_pct > 100 {
            return Err(AppError::BadRequest(
                "failure_pct must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct LoadStatus {
    pub running: bool,
    pub message: String,
}

// ─── POST /api/load/start ────────────────────────────────────────

pub async fn start_load(
    State(state): State<Arc<AppState>>,
    Json(config): Json<LoadConfig>,
) -> Result<Json<LoadStatus>, AppError> {
    config.validate()?;

    // Start and stop both run under the handle lock, so a stop can never
    // take the handle of a run that started after it.
    let mut slot = state.load_handle.lock().await;
    if state.load_running.swap(true, Ordering::SeqCst) {
        return Err(AppError::AlreadyRunning);
    }

    let msg = format!(
        "Started: {} workers × {}s, {}% failures",
        config.concurrency, config.duration_secs, config.failure_pct,
    );
    tracing::info!(
        concurrency = config.concurrency,
        duration_secs = config.duration_secs,
        failure_pct = config.failure_pct,
        "load generator started"
    );

    let running = state.load_running.clone();
    let interceptor = state.interceptor.clone();

    let handle = tokio::spawn(async move {
        crate::load_generator::run(running, interceptor, config).await;
    });

    *slot = Some(handle);

    Ok(Json(LoadStatus {
        running: true,
        message: msg,
    }))
}

// ─── POST /api/load/stop ─────────────────────────────────────────

pub async fn stop_load(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    if !halt(&state).await {
        return Json(LoadStatus {
            running: false,
            message: "No load generator is running".into(),
        });
    }
    tracing::info!("load generator stopped");

    Json(LoadStatus {
        running: false,
        message: "Load generator stopped".into(),
    })
}

/// Clear the running flag and await the current run, if any, so every
/// in-flight call has been recorded. Returns whether a run was active.
pub async fn halt(state: &AppState) -> bool {
    let mut slot = state.load_handle.lock().await;
    let was_running = state.load_running.swap(false, Ordering::SeqCst);
    if let Some(handle) = slot.take() {
        // JoinError only means the task already finished or panicked
        let _ = handle.await;
    }
    was_running
}

// ─── GET /api/load/status ────────────────────────────────────────

pub async fn load_status(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    let running = state.load_running.load(Ordering::SeqCst);
    Json(LoadStatus {
        running,
        message: if running {
            "Load generator in progress".into()
        } else {
            "Idle".into()
        },
    })
}
