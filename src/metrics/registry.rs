use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use super::collector::{OperationMetrics, OperationStats, DEFAULT_RESERVOIR_CAPACITY};
use super::export;
use super::{operation_key, Layer};

/// Owns the key → `OperationMetrics` map.
///
/// Built once by the composition root and shared by reference (`Arc`)
/// with the interceptor and the query service; there is no global instance.
///
/// The map is sharded, so first-use creation for one key never blocks
/// recording against another. Reset and snapshot reads are not atomic
/// across the whole map: a recording that races a reset may land in an
/// instance that is already detached and be lost.
#[derive(Debug)]
pub struct MetricsRegistry {
    operations: DashMap<String, Arc<OperationMetrics>>,
    reservoir_capacity: usize,
    export_dir: PathBuf,
}

impl MetricsRegistry {
    pub fn new(reservoir_capacity: usize, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            operations: DashMap::new(),
            reservoir_capacity,
            export_dir: export_dir.into(),
        }
    }

    /// Record one call. Never fails; the outcome is data, not control flow.
    pub fn record_execution(&self, layer: Layer, operation: &str, duration_ms: u64, success: bool) {
        let key = operation_key(layer, operation);
        self.entry(key).record_execution(duration_ms, success);
    }

    /// Get the metrics for `key`, creating them on first use.
    fn entry(&self, key: String) -> Arc<OperationMetrics> {
        if let Some(existing) = self.operations.get(&key) {
            return existing.value().clone();
        }
        self.operations
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::debug!(operation = %key, "monitoring new operation");
                Arc::new(OperationMetrics::with_capacity(key, self.reservoir_capacity))
            })
            .value()
            .clone()
    }

    /// Live handle for one operation, or `None` if it was never recorded.
    pub fn get_metrics(&self, key: &str) -> Option<Arc<OperationMetrics>> {
        self.operations.get(key).map(|e| e.value().clone())
    }

    /// Owned point-in-time copy of every operation's statistics.
    pub fn get_all_metrics(&self) -> HashMap<String, OperationStats> {
        self.handles()
            .into_iter()
            .map(|m| (m.method_name().to_owned(), m.stats()))
            .collect()
    }

    /// Same snapshot as `get_all_metrics`, as a list.
    pub fn snapshot(&self) -> Vec<OperationStats> {
        self.handles().iter().map(|m| m.stats()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Drop every tracked operation.
    pub fn reset_metrics(&self) {
        let dropped = self.operations.len();
        self.operations.clear();
        tracing::info!(operations = dropped, "metrics reset");
    }

    /// Write a summary of the current statistics under the export directory.
    ///
    /// Returns the file written, or `None` if writing failed. Failures are
    /// logged here and never propagated.
    pub fn export_performance_summary(&self) -> Option<PathBuf> {
        let stats = self.snapshot();
        match export::write_summary(&self.export_dir, &stats) {
            Ok(path) => {
                tracing::info!(
                    path = %path.display(),
                    operations = stats.len(),
                    "performance summary exported"
                );
                Some(path)
            }
            Err(e) => {
                tracing::error!(error = %e, "performance summary export failed");
                None
            }
        }
    }

    // Collect Arcs first so stats() runs without holding shard locks.
    fn handles(&self) -> Vec<Arc<OperationMetrics>> {
        self.operations.iter().map(|e| e.value().clone()).collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_CAPACITY, "logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn creates_entry_on_first_record() {
        let reg = MetricsRegistry::default();
        assert!(reg.get_metrics("SERVICE::createUser").is_none());

        reg.record_execution(Layer::Service, "createUser", 12, true);
        reg.record_execution(Layer::Service, "createUser", 8, false);

        let m = reg.get_metrics("SERVICE::createUser").unwrap();
        assert_eq!(m.method_name(), "SERVICE::createUser");
        assert_eq!(m.total_calls(), 2);
        assert_eq!(m.failed_calls(), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn layers_are_distinct_keys() {
        let reg = MetricsRegistry::default();
        reg.record_execution(Layer::Service, "save", 1, true);
        reg.record_execution(Layer::Repository, "save", 1, true);
        assert_eq!(reg.len(), 2);
        assert!(reg.get_metrics("REPOSITORY::save").is_some());
    }

    #[test]
    fn snapshot_is_detached_from_registry() {
        let reg = MetricsRegistry::default();
        reg.record_execution(Layer::Service, "a", 10, true);

        let mut snap = reg.get_all_metrics();
        reg.record_execution(Layer::Service, "a", 10, true);
        reg.record_execution(Layer::Service, "b", 10, true);

        assert_eq!(snap.len(), 1);
        assert_eq!(snap["SERVICE::a"].total_calls, 1);

        snap.clear();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get_metrics("SERVICE::a").unwrap().total_calls(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let reg = MetricsRegistry::default();
        reg.record_execution(Layer::Service, "createUser", 100, true);
        reg.record_execution(Layer::Repository, "save", 5, true);

        reg.reset_metrics();

        assert!(reg.get_all_metrics().is_empty());
        assert!(reg.is_empty());
    }

    #[test]
    fn capacity_flows_into_new_entries() {
        let reg = MetricsRegistry::new(4, "logs");
        for d in 0..10 {
            reg.record_execution(Layer::Repository, "scan", d, true);
        }
        let m = reg.get_metrics("REPOSITORY::scan").unwrap();
        assert_eq!(m.stats().percentiles.count, 4);
        assert_eq!(m.total_calls(), 10);
    }

    #[test]
    fn racing_first_calls_share_one_instance() {
        let reg = Arc::new(MetricsRegistry::default());
        thread::scope(|s| {
            for _ in 0..16 {
                let reg = &reg;
                s.spawn(move || {
                    for _ in 0..50 {
                        reg.record_execution(Layer::Service, "fresh", 1, true);
                    }
                });
            }
        });
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get_metrics("SERVICE::fresh").unwrap().total_calls(), 800);
    }

    #[test]
    fn reset_during_recording_does_not_panic() {
        let reg = Arc::new(MetricsRegistry::default());
        thread::scope(|s| {
            for t in 0..4 {
                let reg = &reg;
                s.spawn(move || {
                    for i in 0..1000 {
                        reg.record_execution(Layer::Service, &format!("op{}", t), i, true);
                    }
                });
            }
            let reg = &reg;
            s.spawn(move || {
                for _ in 0..50 {
                    reg.reset_metrics();
                }
            });
        });
        for stats in reg.get_all_metrics().values() {
            assert_eq!(stats.successful_calls + stats.failed_calls, stats.total_calls);
        }
    }

    #[test]
    fn export_writes_into_configured_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = MetricsRegistry::new(16, tmp.path().join("logs"));
        reg.record_execution(Layer::Service, "createUser", 40, true);

        let path = reg.export_performance_summary().unwrap();

        assert!(path.starts_with(tmp.path().join("logs")));
        assert!(path.to_string_lossy().ends_with("-export.log"));
    }

    #[test]
    fn export_failure_is_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("logs");
        std::fs::write(&blocker, b"x").unwrap();
        let reg = MetricsRegistry::new(16, blocker.clone());
        reg.record_execution(Layer::Service, "createUser", 40, true);

        assert!(reg.export_performance_summary().is_none());
    }
}
