//! Formatting helpers and run summaries for log output.

use std::time::{Duration, Instant};

use crate::metrics::{MateMergeMetrics, UniqMetrics};

/// Formats an integer with thousands separators.
///
/// ```
/// use fraguniq_lib::logging::format_count;
///
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(12), "12");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let groups: Vec<String> = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    groups.join(",")
}

/// Formats a fraction (0.0-1.0) as a percentage with `decimals` places.
///
/// ```
/// use fraguniq_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0)
}

/// Formats a duration as e.g. `45s`, `2m 15s` or `1h 30m`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => match (secs / 60, secs % 60) {
            (m, 0) => format!("{m}m"),
            (m, s) => format!("{m}m {s}s"),
        },
        _ => match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{h}h"),
            (h, m) => format!("{h}h {m}m"),
        },
    }
}

/// Formats a record rate, falling back to records per minute below one per
/// second.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} records/s", format_count(count));
    }
    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} records/s", format_count(rate as u64))
    } else {
        format!("{:.1} records/min", rate * 60.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

/// Logs a summary of a duplicate-removal run.
pub fn log_uniq_summary(metrics: &UniqMetrics) {
    log::info!("Duplicate Removal Summary:");
    log::info!("  Input reads: {}", format_count(metrics.input.reads));
    log::info!("  Unique reads: {}", format_count(metrics.output.reads));
    log::info!(
        "  Reads removed: {} ({})",
        format_count(metrics.reads_removed()),
        format_percent(fraction(metrics.reads_removed(), metrics.input.reads), 2)
    );
    log::info!("  Duplicated sub-groups: {}", format_count(metrics.reads_duped));
    if let Some((size, _)) = metrics.histogram.last_key_value() {
        log::info!("  Largest sub-group: {size}");
    }
}

/// Logs a summary of a mate-merging run.
pub fn log_merge_summary(metrics: &MateMergeMetrics) {
    log::info!("Mate Merge Summary:");
    log::info!("  Input records: {}", format_count(metrics.records_in));
    log::info!("  Mate pairs: {}", format_count(metrics.pairs_seen));
    log::info!(
        "  Merged pairs: {} ({})",
        format_count(metrics.pairs_merged),
        format_percent(metrics.merged_fraction(), 2)
    );
    log::info!("  Records written unmerged: {}", format_count(metrics.singles));
    log::info!("  Output records: {}", format_count(metrics.records_out()));
}

/// Logs the start of an operation and, on completion, its duration and rate.
///
/// ```no_run
/// use fraguniq_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Removing duplicates");
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} records in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ReadStats;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1000, "1,000")]
    #[case(1_234_567, "1,234,567")]
    fn test_format_count(#[case] n: u64, #[case] expected: &str) {
        assert_eq!(format_count(n), expected);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.5, 1), "50.0%");
        assert_eq!(format_percent(0.0, 2), "0.00%");
    }

    #[rstest]
    #[case(0, "0s")]
    #[case(45, "45s")]
    #[case(60, "1m")]
    #[case(135, "2m 15s")]
    #[case(3600, "1h")]
    #[case(5400, "1h 30m")]
    fn test_format_duration(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 records/s");
        assert_eq!(format_rate(30, Duration::from_secs(60)), "30.0 records/min");
        assert!(format_rate(1000, Duration::from_nanos(1)).contains("records/s"));
    }

    #[test]
    fn test_summaries_do_not_panic() {
        log_uniq_summary(&UniqMetrics::new());
        let mut m = UniqMetrics::new();
        m.input = ReadStats { reads: 10, bases: 500 };
        m.output = ReadStats { reads: 7, bases: 350 };
        m.record_group(4);
        log_uniq_summary(&m);
        log_merge_summary(&MateMergeMetrics::default());

        let timer = OperationTimer::new("Test");
        timer.log_completion(10);
    }
}
