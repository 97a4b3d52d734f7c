use serde::Serialize;

/// The percentile breakdown reported for one operation.
/// Derived from the reservoir, so it only reflects the most recent samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSet {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    /// Number of reservoir samples the figures were computed from.
    pub count: u64,
}

impl PercentileSet {
    /// Extract p50/p95/p99 from an ascending-sorted sample slice.
    /// Returns zeroed values if the slice is empty.
    pub fn from_sorted(sorted: &[u64]) -> Self {
        if sorted.is_empty() {
            return Self::empty();
        }

        Self {
            p50: nearest_rank(sorted, 50.0),
            p95: nearest_rank(sorted, 95.0),
            p99: nearest_rank(sorted, 99.0),
            count: sorted.len() as u64,
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self {
            p50: 0,
            p95: 0,
            p99: 0,
            count: 0,
        }
    }
}

/// Nearest-rank percentile over an ascending-sorted slice.
///
/// index = ceil(p / 100 * n) - 1, clamped to `[0, n - 1]`.
/// An empty slice yields 0.
pub fn nearest_rank(sorted: &[u64], p: f64) -> u64 {
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    let rank = (p * n as f64 / 100.0).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    sorted[idx]
}

/// Population standard deviation: sqrt(sum((x - mean)^2) / n).
/// Fewer than two samples yield 0.
pub fn std_deviation(samples: &[u64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}
