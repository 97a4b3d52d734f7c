use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::handlers::load::LoadConfig;
use crate::metrics::Layer;
use crate::middleware::Interceptor;

// ─── Operation catalogue ─────────────────────────────────────────

/// Synthetic operations and their typical latency (ms).
static CATALOGUE: &[(Layer, &str, u64)] = &[
    (Layer::Service, "createUser", 120),
    (Layer::Service, "getUser", 30),
    (Layer::Service, "createPost", 250),
    (Layer::Service, "listPosts", 80),
    (Layer::Service, "addComment", 150),
    (Layer::Repository, "findUserById", 8),
    (Layer::Repository, "saveUser", 40),
    (Layer::Repository, "findPostsByAuthor", 60),
    (Layer::Repository, "saveComment", 35),
];

#[derive(Debug, Error)]
#[error("simulated failure in {0}")]
pub struct SimulatedFailure(&'static str);

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that issue wrapped calls until the
/// deadline or the `running` flag is set to false.
pub async fn run(running: Arc<AtomicBool>, interceptor: Interceptor, config: LoadConfig) {
    let deadline = Instant::now() + Duration::from_secs(config.duration_secs);

    let mut handles = Vec::with_capacity(config.concurrency as usize);

    for worker_id in 0..config.concurrency {
        let running = running.clone();
        let interceptor = interceptor.clone();
        let failure_pct = config.failure_pct;

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, interceptor, deadline, failure_pct).await;
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    running.store(false, Ordering::SeqCst);
    tracing::info!("load generator finished");
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    interceptor: Interceptor,
    deadline: Instant,
    failure_pct: u8,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let (layer, name, typical_ms) = CATALOGUE[rng.gen_range(0..CATALOGUE.len())];
        let latency_ms = rng.gen_range(typical_ms / 2..=typical_ms * 3 / 2);
        let fail = rng.gen_range(0u8..100) < failure_pct;

        let _ = interceptor
            .wrap_async(layer, name, simulated_call(name, latency_ms, fail))
            .await;
    }
}

async fn simulated_call(
    name: &'static str,
    latency_ms: u64,
    fail: bool,
) -> Result<(), SimulatedFailure> {
    tokio::time::sleep(Duration::from_millis(latency_ms)).await;
    if fail {
        Err(SimulatedFailure(name))
    } else {
        Ok(())
    }
}
