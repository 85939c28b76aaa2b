//! Input validation utilities
//!
//! Checks for command-line parameters, file paths and records read from a
//! BAM file, reported through the structured errors in [`crate::errors`].

use crate::errors::{FraguniqError, Result, read_name_of};
use fraguniq_raw_bam::RawRecord;
use std::fmt::Display;
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input BAM")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use fraguniq_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.bam", "Input BAM");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(FraguniqError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
///
/// # Example
/// ```
/// use fraguniq_lib::validation::validate_positive;
///
/// validate_positive(10_000, "max-frag-len").unwrap();
/// assert!(validate_positive(0, "max-frag-len").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(FraguniqError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}

fn check_reference(
    record: &RawRecord,
    field: &'static str,
    tid: i32,
    pos: i32,
    target_lengths: &[usize],
) -> Result<()> {
    let malformed = |reason: String| FraguniqError::MalformedRecord {
        read_name: read_name_of(record),
        field,
        reason,
    };
    if tid == -1 {
        return Ok(());
    }
    let Some(&length) = usize::try_from(tid).ok().and_then(|t| target_lengths.get(t)) else {
        return Err(malformed(format!(
            "reference index {tid} is outside the {} header references",
            target_lengths.len()
        )));
    };
    if pos < -1 || usize::try_from(pos).is_ok_and(|p| p >= length) {
        return Err(malformed(format!("position {pos} is outside reference {tid} of length {length}")));
    }
    Ok(())
}

/// Check a record's reference fields against the header.
///
/// `tid` and mate `tid` must be `-1` or index a header reference, and the
/// matching positions must fall inside that reference.
///
/// # Errors
/// Returns [`FraguniqError::MalformedRecord`] naming the offending field
/// (`tid` or `mtid`).
pub fn validate_record(record: &RawRecord, target_lengths: &[usize]) -> Result<()> {
    check_reference(record, "tid", record.ref_id(), record.pos(), target_lengths)?;
    check_reference(record, "mtid", record.mate_ref_id(), record.mate_pos(), target_lengths)
}
