use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crud_telemetry::{handlers, server, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crud_telemetry=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 1. Load configuration ────────────────────────────────────
    let config = AppConfig::from_env()?;
    tracing::info!(
        reservoir_capacity = config.telemetry.reservoir_capacity,
        slow_threshold_ms = config.telemetry.slow_threshold_ms,
        export_dir = %config.telemetry.export_dir.display(),
        "configuration loaded"
    );

    // ── 2. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState::new(&config.telemetry));

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state.clone());

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(addr = %listener.local_addr()?, "metrics API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ── 5. Stop the workload so its last calls are recorded ──────
    handlers::load::halt(&state).await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
