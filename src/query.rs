use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::metrics::{MetricsRegistry, OperationStats, KEY_SEPARATOR};

// ─── Classification ──────────────────────────────────────────────

/// Coarse health bucket derived from an operation's average duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceLevel {
    Fast,
    Normal,
    Slow,
    Critical,
}

impl PerformanceLevel {
    /// `<100` FAST, `[100,500)` NORMAL, `[500,1000)` SLOW, `>=1000` CRITICAL.
    pub fn from_average(avg_ms: u64) -> Self {
        match avg_ms {
            0..=99 => Self::Fast,
            100..=499 => Self::Normal,
            500..=999 => Self::Slow,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "FAST",
            Self::Normal => "NORMAL",
            Self::Slow => "SLOW",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Views ───────────────────────────────────────────────────────

/// Formatted statistics for one operation, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodMetricsView {
    pub method_name: String,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub failure_rate: f64,
    pub average_time_ms: u64,
    pub min_time_ms: u64,
    pub max_time_ms: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub std_deviation_ms: f64,
    pub performance_level: PerformanceLevel,
}

impl From<&OperationStats> for MethodMetricsView {
    fn from(s: &OperationStats) -> Self {
        Self {
            method_name: s.method_name.clone(),
            total_calls: s.total_calls,
            successful_calls: s.successful_calls,
            failed_calls: s.failed_calls,
            failure_rate: round2(s.failure_rate),
            average_time_ms: s.average_time_ms,
            min_time_ms: s.min_time_ms,
            max_time_ms: s.max_time_ms,
            p50_ms: s.percentiles.p50,
            p95_ms: s.percentiles.p95,
            p99_ms: s.percentiles.p99,
            std_deviation_ms: round2(s.std_deviation_ms),
            performance_level: PerformanceLevel::from_average(s.average_time_ms),
        }
    }
}

/// Result of a single-operation lookup. A miss is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MethodLookup {
    Found(MethodMetricsView),
    NotFound { error: String },
}

impl MethodLookup {
    fn not_found() -> Self {
        Self::NotFound {
            error: "Method not found".into(),
        }
    }
}

/// Registry-wide aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_methods_monitored: usize,
    pub total_calls: u64,
    pub total_failures: u64,
    /// Unweighted mean of each operation's own average. Low-traffic
    /// operations weigh as much as hot ones.
    pub overall_average_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodFailures {
    pub method_name: String,
    pub failed_calls: u64,
    pub total_calls: u64,
    pub failure_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureStatistics {
    pub methods: Vec<MethodFailures>,
    pub total_calls: u64,
    pub total_failures: u64,
    /// Percent of all recorded calls that failed.
    pub overall_failure_rate: f64,
}

// ─── Service ─────────────────────────────────────────────────────

/// Read-only views over a [`MetricsRegistry`].
///
/// Every read works on a fresh snapshot; nothing here mutates statistics.
#[derive(Debug, Clone)]
pub struct MetricsQueryService {
    registry: Arc<MetricsRegistry>,
}

impl MetricsQueryService {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Every operation, slowest average first.
    pub fn get_all_metrics_formatted(&self) -> Vec<MethodMetricsView> {
        self.sorted_views(|_| true)
    }

    pub fn get_method_metrics_formatted(&self, key: &str) -> MethodLookup {
        match self.registry.get_metrics(key) {
            Some(m) => MethodLookup::Found(MethodMetricsView::from(&m.stats())),
            None => MethodLookup::not_found(),
        }
    }

    pub fn get_metrics_summary(&self) -> MetricsSummary {
        let stats = self.registry.snapshot();
        let count = stats.len();

        let total_calls = stats.iter().map(|s| s.total_calls).sum();
        let total_failures = stats.iter().map(|s| s.failed_calls).sum();
        let overall_average_time_ms = if count == 0 {
            0.0
        } else {
            stats.iter().map(|s| s.average_time_ms as f64).sum::<f64>() / count as f64
        };

        MetricsSummary {
            total_methods_monitored: count,
            total_calls,
            total_failures,
            overall_average_time_ms: round2(overall_average_time_ms),
        }
    }

    /// Operations whose average exceeds `threshold_ms`. A zero threshold
    /// returns every operation, including ones averaging 0 ms.
    pub fn get_slow_methods(&self, threshold_ms: u64) -> Vec<MethodMetricsView> {
        self.sorted_views(|s| threshold_ms == 0 || s.average_time_ms > threshold_ms)
    }

    /// The `limit` slowest operations by average, ties by key.
    pub fn get_top_slow_methods(&self, limit: usize) -> Vec<MethodMetricsView> {
        let mut views = self.get_all_metrics_formatted();
        views.truncate(limit);
        views
    }

    /// Operations recorded under `layer`, matched case-insensitively.
    pub fn get_metrics_by_layer(&self, layer: &str) -> Vec<MethodMetricsView> {
        let prefix = format!("{}{KEY_SEPARATOR}", layer.trim().to_uppercase());
        self.sorted_views(|s| s.method_name.starts_with(&prefix))
    }

    pub fn get_failure_statistics(&self) -> FailureStatistics {
        let stats = self.registry.snapshot();

        let total_calls: u64 = stats.iter().map(|s| s.total_calls).sum();
        let total_failures: u64 = stats.iter().map(|s| s.failed_calls).sum();
        let overall_failure_rate = if total_calls == 0 {
            0.0
        } else {
            total_failures as f64 / total_calls as f64 * 100.0
        };

        let mut methods: Vec<MethodFailures> = stats
            .iter()
            .map(|s| MethodFailures {
                method_name: s.method_name.clone(),
                failed_calls: s.failed_calls,
                total_calls: s.total_calls,
                failure_rate: round2(s.failure_rate),
            })
            .collect();
        methods.sort_by(|a, b| {
            b.failed_calls
                .cmp(&a.failed_calls)
                .then_with(|| a.method_name.cmp(&b.method_name))
        });

        FailureStatistics {
            methods,
            total_calls,
            total_failures,
            overall_failure_rate: round2(overall_failure_rate),
        }
    }

    pub fn reset_metrics(&self) {
        self.registry.reset_metrics();
    }

    pub fn export_performance_summary(&self) -> Option<PathBuf> {
        self.registry.export_performance_summary()
    }

    fn sorted_views(&self, keep: impl Fn(&OperationStats) -> bool) -> Vec<MethodMetricsView> {
        let mut stats: Vec<OperationStats> =
            self.registry.snapshot().into_iter().filter(|s| keep(s)).collect();
        stats.sort_by(slowest_first);
        stats.iter().map(MethodMetricsView::from).collect()
    }
}

fn slowest_first(a: &OperationStats, b: &OperationStats) -> Ordering {
    b.average_time_ms
        .cmp(&a.average_time_ms)
        .then_with(|| a.method_name.cmp(&b.method_name))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
