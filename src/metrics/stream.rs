use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::query::{MethodMetricsView, MetricsQueryService, MetricsSummary};
use crate::AppState;

/// How many of the slowest operations each frame carries.
const TOP_N: usize = 5;

/// One SSE tick: the aggregate plus the current slowest operations.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardFrame {
    pub summary: MetricsSummary,
    pub top: Vec<MethodMetricsView>,
}

impl DashboardFrame {
    pub fn capture(query: &MetricsQueryService) -> Self {
        Self {
            summary: query.get_metrics_summary(),
            top: query.get_top_slow_methods(TOP_N),
        }
    }
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes a `DashboardFrame` as JSON every 500 ms.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let frame = DashboardFrame::capture(&state.query);
        let json = serde_json::to_string(&frame).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Layer, MetricsRegistry};

    #[test]
    fn frame_caps_top_list() {
        let registry = Arc::new(MetricsRegistry::default());
        for i in 0..8u64 {
            registry.record_execution(Layer::Service, &format!("op{i}"), i * 10, true);
        }
        let frame = DashboardFrame::capture(&MetricsQueryService::new(registry));
        assert_eq!(frame.summary.total_methods_monitored, 8);
        assert_eq!(frame.top.len(), TOP_N);
        assert_eq!(frame.top[0].method_name, "SERVICE::op7");
    }
}
