//! Execution telemetry for the service and repository layers of a CRUD
//! backend.
//!
//! Calls are wrapped with [`Interceptor::wrap`] (or `wrap_async`), which
//! records duration and outcome into a [`MetricsRegistry`]. The
//! [`MetricsQueryService`] turns the registry into sorted, classified
//! views, and the Axum router in [`server`] serves them over HTTP.
//!
//! ```text
//!   caller ─▶ Interceptor::wrap ─▶ body
//!                  │
//!                  ▼ record_execution
//!            MetricsRegistry ──▶ OperationMetrics (atomics + reservoir)
//!                  │
//!                  ▼ snapshot
//!          MetricsQueryService ──▶ handlers / SSE / export file
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handlers;
pub mod load_generator;
pub mod metrics;
pub mod middleware;
pub mod query;
pub mod server;

pub use config::{AppConfig, TelemetryConfig};
pub use error::TelemetryError;
pub use metrics::{operation_key, Layer, MetricsRegistry, OperationMetrics, OperationStats};
pub use middleware::Interceptor;
pub use query::{MetricsQueryService, PerformanceLevel};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Registry the interceptor writes into and the query service reads.
    pub registry: Arc<MetricsRegistry>,

    pub query: MetricsQueryService,

    /// Decorator used by the synthetic workload.
    pub interceptor: Interceptor,

    /// Flag checked by every load-generator worker on each iteration.
    pub load_running: Arc<AtomicBool>,

    /// Handle to the spawned load-generator task so we can await clean shutdown.
    pub load_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppState {
    /// Build the registry and everything that shares it.
    pub fn new(config: &TelemetryConfig) -> Self {
        let registry = Arc::new(MetricsRegistry::new(
            config.reservoir_capacity,
            config.export_dir.clone(),
        ));
        Self {
            query: MetricsQueryService::new(registry.clone()),
            interceptor: Interceptor::with_slow_threshold(registry.clone(), config.slow_threshold()),
            registry,
            load_running: Arc::new(AtomicBool::new(false)),
            load_handle: tokio::sync::Mutex::new(None),
        }
    }
}
