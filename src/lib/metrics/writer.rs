//! Statistics and histogram report files.
//!
//! The statistics report holds one `key: value` line per counter; the
//! histogram report holds one `size<TAB>count` line per non-empty size, in
//! ascending size order.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::UniqMetrics;

/// Significant digits for floating-point report values.
const SIGNIFICANT_DIGITS: usize = 6;

/// Format a float with six significant digits, trailing zeros removed.
///
/// Values whose decimal exponent is below -4 or at least 6 use exponent
/// notation with a signed two-digit exponent.
///
/// ```
/// use fraguniq_lib::metrics::format_general;
///
/// assert_eq!(format_general(0.5), "0.5");
/// assert_eq!(format_general(2.0 / 3.0), "0.666667");
/// assert_eq!(format_general(1234567.0), "1.23457e+06");
/// assert_eq!(format_general(0.0), "0");
/// ```
#[must_use]
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    // Rounding to the target precision can carry into the next power of ten,
    // so the exponent is read back from the rounded form.
    let sci = format!("{value:.prec$e}", prec = SIGNIFICANT_DIGITS - 1);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') { s.trim_end_matches('0').trim_end_matches('.') } else { s }
}

/// Render the statistics report.
#[must_use]
pub fn stats_report(metrics: &UniqMetrics) -> String {
    format!(
        "total_reads: {}\n\
         total_bases: {}\n\
         unique_reads: {}\n\
         unique_read_bases: {}\n\
         non_duplicate_fraction: {}\n\
         duplicate_reads: {}\n\
         reads_removed: {}\n\
         duplication_rate: {}\n",
        metrics.input.reads,
        metrics.input.bases,
        metrics.output.reads,
        metrics.output.bases,
        format_general(metrics.non_duplicate_fraction()),
        metrics.reads_duped,
        metrics.reads_removed(),
        format_general(metrics.duplication_rate()),
    )
}

/// Render the histogram report.
#[must_use]
pub fn histogram_report(metrics: &UniqMetrics) -> String {
    metrics
        .histogram
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(size, count)| format!("{size}\t{count}\n"))
        .collect()
}

fn write_report(path: &Path, contents: &str, description: &str) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {description} file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents.as_bytes())
        .and_then(|()| writer.flush())
        .with_context(|| format!("Failed to write {description} file: {}", path.display()))
}

/// Write the statistics report to `path`.
///
/// # Errors
/// Returns an error if the file cannot be created or written to.
pub fn write_stats_report<P: AsRef<Path>>(path: P, metrics: &UniqMetrics) -> Result<()> {
    write_report(path.as_ref(), &stats_report(metrics), "statistics")
}

/// Write the duplicate-count histogram to `path`.
///
/// # Errors
/// Returns an error if the file cannot be created or written to.
pub fn write_histogram_report<P: AsRef<Path>>(path: P, metrics: &UniqMetrics) -> Result<()> {
    write_report(path.as_ref(), &histogram_report(metrics), "histogram")
}
