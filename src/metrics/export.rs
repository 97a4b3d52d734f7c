use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::collector::OperationStats;
use crate::error::TelemetryError;
use crate::query::PerformanceLevel;

/// Suffix every export file name ends with.
pub const EXPORT_SUFFIX: &str = "-export.log";

/// Write a plain-text performance summary into `dir`, creating it if needed.
///
/// The report is written to a temporary file next to the target and renamed
/// into place, so an interrupted write never leaves a truncated export
/// behind and never touches earlier ones.
pub fn write_summary(dir: &Path, stats: &[OperationStats]) -> Result<PathBuf, TelemetryError> {
    fs::create_dir_all(dir).map_err(|e| TelemetryError::io(dir, e))?;

    let now = Utc::now();
    let target = dir.join(format!("{}{EXPORT_SUFFIX}", now.format("%Y%m%d-%H%M%S%.3f")));
    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    let report = render(now, stats);

    let result = write_file(&tmp, report.as_bytes())
        .and_then(|_| fs::rename(&tmp, &target).map_err(|e| TelemetryError::io(&target, e)));

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result.map(|_| target)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), TelemetryError> {
    let mut file = File::create(path).map_err(|e| TelemetryError::io(path, e))?;
    file.write_all(bytes).map_err(|e| TelemetryError::io(path, e))?;
    file.sync_all().map_err(|e| TelemetryError::io(path, e))
}

// ─── Report layout ───────────────────────────────────────────────

/// Render the report body. Operations are listed by key.
pub fn render(generated_at: DateTime<Utc>, stats: &[OperationStats]) -> String {
    let mut sorted: Vec<&OperationStats> = stats.iter().collect();
    sorted.sort_by(|a, b| a.method_name.cmp(&b.method_name));

    let mut out = String::new();
    let _ = writeln!(out, "=== Performance Summary ===");
    let _ = writeln!(out, "Generated: {}", generated_at.to_rfc3339());
    let _ = writeln!(out, "Operations monitored: {}", sorted.len());

    for s in sorted {
        let level = PerformanceLevel::from_average(s.average_time_ms);
        let _ = writeln!(out);
        let _ = writeln!(out, "[{}]", s.method_name);
        let _ = writeln!(out, "  Total calls:      {}", s.total_calls);
        let _ = writeln!(out, "  Successful:       {}", s.successful_calls);
        let _ = writeln!(
            out,
            "  Failed:           {} ({:.2}%)",
            s.failed_calls, s.failure_rate
        );
        let _ = writeln!(out, "  Average:          {} ms", s.average_time_ms);
        let _ = writeln!(
            out,
            "  Min / Max:        {} / {} ms",
            s.min_time_ms, s.max_time_ms
        );
        let _ = writeln!(
            out,
            "  P50 / P95 / P99:  {} / {} / {} ms",
            s.percentiles.p50, s.percentiles.p95, s.percentiles.p99
        );
        let _ = writeln!(out, "  Std deviation:    {:.2} ms", s.std_deviation_ms);
        let _ = writeln!(out, "  Status:           {level}");
    }

    out
}
