//! Errors raised while reading or editing raw record bytes.

use thiserror::Error;

/// Failure modes for raw record parsing, editing and synthesis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The blob ends before a segment it declares.
    #[error("Truncated record: {field} needs {needed} bytes but only {available} remain")]
    Truncated { field: &'static str, needed: usize, available: usize },

    /// A field holds a value that breaks the record layout.
    #[error("Malformed record field '{field}': {reason}")]
    Malformed { field: &'static str, reason: String },

    /// A CIGAR has no operation that consumes reference bases.
    #[error("CIGAR consumes no reference bases: {cigar}")]
    NoReferenceOps { cigar: String },

    /// The backing buffer could not be grown.
    #[error("Failed to allocate {requested} bytes for record data")]
    Allocation { requested: usize },
}

/// Result alias for raw record operations.
pub type Result<T> = std::result::Result<T, RecordError>;

impl RecordError {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed { field, reason: reason.into() }
    }
}
