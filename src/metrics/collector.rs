use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::{self, PercentileSet};
use super::reservoir::Reservoir;

// ─── Configuration ───────────────────────────────────────────────

/// Reservoir size used when no explicit capacity is configured.
pub const DEFAULT_RESERVOIR_CAPACITY: usize = 1_000;

/// Sentinel held by `min_ms` until the first sample arrives.
const NO_MIN: u64 = u64::MAX;

/// Attempts at a stable counter read before settling for the last one.
const SNAPSHOT_RETRIES: usize = 8;

// ─── Public types ────────────────────────────────────────────────

/// Online execution statistics for one operation.
///
/// Counts, sum, min and max are exact over the whole lifetime and are
/// updated lock-free. There is no separate total counter: the total is
/// always `successful + failed`, so the two can never disagree.
/// Percentiles and standard deviation come from a bounded reservoir of the
/// most recent samples, which is the only part guarded by a lock; that lock
/// is per instance and only held for a push or a copy.
#[derive(Debug)]
pub struct OperationMetrics {
    method_name: String,

    successful: AtomicU64,
    failed: AtomicU64,
    sum_ms: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,

    reservoir: Mutex<Reservoir>,
}

/// Point-in-time copy of an operation's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStats {
    pub method_name: String,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_time_ms: u64,
    pub average_time_ms: u64,
    pub min_time_ms: u64,
    pub max_time_ms: u64,
    /// Percent of calls that failed.
    pub failure_rate: f64,
    pub std_deviation_ms: f64,
    pub percentiles: PercentileSet,
}

/// Outcome counts and duration sum read together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counters {
    successful: u64,
    failed: u64,
    sum_ms: u64,
}

impl Counters {
    fn total(&self) -> u64 {
        self.successful + self.failed
    }

    fn average(&self) -> u64 {
        match self.total() {
            0 => 0,
            total => self.sum_ms / total,
        }
    }

    fn failure_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.failed as f64 / total as f64 * 100.0,
        }
    }
}

// ─── OperationMetrics impl ───────────────────────────────────────

impl OperationMetrics {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self::with_capacity(method_name, DEFAULT_RESERVOIR_CAPACITY)
    }

    pub fn with_capacity(method_name: impl Into<String>, capacity: usize) -> Self {
        Self {
            method_name: method_name.into(),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            sum_ms: AtomicU64::new(0),
            min_ms: AtomicU64::new(NO_MIN),
            max_ms: AtomicU64::new(0),
            reservoir: Mutex::new(Reservoir::with_capacity(capacity)),
        }
    }

    /// Record one completed call.
    pub fn record_execution(&self, duration_ms: u64, success: bool) {
        self.sum_ms.fetch_add(duration_ms, Ordering::Relaxed);
        cas_min(&self.min_ms, duration_ms);
        cas_max(&self.max_ms, duration_ms);

        self.reservoir.lock().push(duration_ms);

        // Outcome last: a reader that sees the call counted also sees its
        // duration in the sum.
        if success {
            self.successful.fetch_add(1, Ordering::Release);
        } else {
            self.failed.fetch_add(1, Ordering::Release);
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn total_calls(&self) -> u64 {
        self.counters().total()
    }

    pub fn successful_calls(&self) -> u64 {
        self.successful.load(Ordering::Acquire)
    }

    pub fn failed_calls(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    pub fn total_execution_time(&self) -> u64 {
        self.counters().sum_ms
    }

    /// Mean duration with truncating division; 0 before the first call.
    pub fn average_execution_time(&self) -> u64 {
        self.counters().average()
    }

    /// Lifetime minimum; 0 before the first call.
    pub fn min_execution_time(&self) -> u64 {
        match self.min_ms.load(Ordering::Relaxed) {
            NO_MIN => 0,
            v => v,
        }
    }

    /// Lifetime maximum; 0 before the first call.
    pub fn max_execution_time(&self) -> u64 {
        self.max_ms.load(Ordering::Relaxed)
    }

    /// Percent of calls that failed; 0.0 before the first call.
    pub fn failure_rate(&self) -> f64 {
        self.counters().failure_rate()
    }

    /// Nearest-rank percentile over the current reservoir; 0 when empty.
    pub fn percentile(&self, p: f64) -> u64 {
        percentiles::nearest_rank(&self.sorted_samples(), p)
    }

    /// Population standard deviation over the current reservoir.
    pub fn standard_deviation(&self) -> f64 {
        percentiles::std_deviation(&self.sorted_samples())
    }

    /// Produce an owned snapshot. The reservoir is copied and sorted once.
    pub fn stats(&self) -> OperationStats {
        let sorted = self.sorted_samples();
        let counters = self.counters();

        OperationStats {
            method_name: self.method_name.clone(),
            total_calls: counters.total(),
            successful_calls: counters.successful,
            failed_calls: counters.failed,
            total_time_ms: counters.sum_ms,
            average_time_ms: counters.average(),
            min_time_ms: self.min_execution_time(),
            max_time_ms: self.max_execution_time(),
            failure_rate: counters.failure_rate(),
            std_deviation_ms: percentiles::std_deviation(&sorted),
            percentiles: PercentileSet::from_sorted(&sorted),
        }
    }

    /// Copy under the lock, sort after releasing it.
    fn sorted_samples(&self) -> Vec<u64> {
        let mut samples = self.reservoir.lock().to_vec();
        samples.sort_unstable();
        samples
    }

    /// Read outcomes and sum until two consecutive outcome reads agree, so
    /// the sum belongs to the same set of calls (plus, at worst, durations
    /// of calls still in flight).
    fn counters(&self) -> Counters {
        let mut outcomes = self.outcomes();
        for _ in 0..SNAPSHOT_RETRIES {
            let sum_ms = self.sum_ms.load(Ordering::Relaxed);
            let again = self.outcomes();
            if again == outcomes {
                return Counters {
                    successful: outcomes.0,
                    failed: outcomes.1,
                    sum_ms,
                };
            }
            outcomes = again;
        }
        Counters {
            successful: outcomes.0,
            failed: outcomes.1,
            sum_ms: self.sum_ms.load(Ordering::Relaxed),
        }
    }

    fn outcomes(&self) -> (u64, u64) {
        (
            self.successful.load(Ordering::Acquire),
            self.failed.load(Ordering::Acquire),
        )
    }
}

// ─── Compare-and-swap helpers ────────────────────────────────────

fn cas_min(cell: &AtomicU64, value: u64) {
    let mut cur = cell.load(Ordering::Relaxed);
    while value < cur {
        match cell.compare_exchange_weak(cur, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(next) => cur = next,
        }
    }
}

fn cas_max(cell: &AtomicU64, value: u64) {
    let mut cur = cell.load(Ordering::Relaxed);
    while value > cur {
        match cell.compare_exchange_weak(cur, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(next) => cur = next,
        }
    }
}
