use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::{operation_key, Layer, MetricsRegistry};

/// Default elapsed time above which a call is logged as slow.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(1000);

/// Explicit decorator placed around service and repository calls.
///
/// `wrap` times the body, treats `Err` as a failure, records the outcome,
/// and hands the body's result back untouched. Recording happens in a drop
/// guard, so a panicking body (or a future dropped before completion) is
/// still counted, as a failure, before the unwind continues.
#[derive(Debug, Clone)]
pub struct Interceptor {
    registry: Arc<MetricsRegistry>,
    slow_threshold: Duration,
}

impl Interceptor {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self::with_slow_threshold(registry, DEFAULT_SLOW_THRESHOLD)
    }

    pub fn with_slow_threshold(registry: Arc<MetricsRegistry>, slow_threshold: Duration) -> Self {
        Self {
            registry,
            slow_threshold,
        }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    pub fn wrap<T, E, F>(&self, layer: Layer, operation: &str, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut guard = CallGuard::start(self, layer, operation);
        let result = body();
        guard.success = result.is_ok();
        result
    }

    pub async fn wrap_async<T, E, Fut>(&self, layer: Layer, operation: &str, body: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let mut guard = CallGuard::start(self, layer, operation);
        let result = body.await;
        guard.success = result.is_ok();
        result
    }
}

// ─── Drop guard ──────────────────────────────────────────────────

/// Records on drop. `success` stays false unless the body returned `Ok`.
struct CallGuard<'a> {
    interceptor: &'a Interceptor,
    layer: Layer,
    operation: &'a str,
    started: Instant,
    success: bool,
}

impl<'a> CallGuard<'a> {
    fn start(interceptor: &'a Interceptor, layer: Layer, operation: &'a str) -> Self {
        Self {
            interceptor,
            layer,
            operation,
            started: Instant::now(),
            success: false,
        }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        self.interceptor
            .registry
            .record_execution(self.layer, self.operation, elapsed_ms, self.success);

        if elapsed > self.interceptor.slow_threshold {
            tracing::warn!(
                operation = %operation_key(self.layer, self.operation),
                elapsed_ms,
                threshold_ms = self.interceptor.slow_threshold.as_millis() as u64,
                success = self.success,
                "slow operation"
            );
        }
    }
}
