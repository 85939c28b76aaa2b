//! Error types for duplicate removal and mate merging.

use bstr::ByteSlice;
use fraguniq_raw_bam::{RawRecord, RecordError};
use thiserror::Error;

/// Result type alias for fraguniq operations
pub type Result<T> = std::result::Result<T, FraguniqError>;

/// Error type for fraguniq operations
#[derive(Error, Debug)]
pub enum FraguniqError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "BAM")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A record field holds a value inconsistent with the header or layout
    #[error("Malformed record '{read_name}': field '{field}' {reason}")]
    MalformedRecord {
        /// Query name of the offending record
        read_name: String,
        /// The field that failed validation
        field: &'static str,
        /// Explanation of the problem
        reason: String,
    },

    /// A tag that a merge depends on is absent
    #[error("Record '{read_name}' is missing required tag {tag}")]
    MissingTag {
        /// Query name of the offending record
        read_name: String,
        /// Two-character tag key
        tag: String,
    },

    /// Input is not sorted by (reference, position)
    #[error(
        "Input is not sorted: '{read_name}' at {ref_id}:{pos} follows a record at {ref_id}:{previous_pos}"
    )]
    UnsortedInput {
        /// Query name of the out-of-order record
        read_name: String,
        /// Reference index shared with the previous record
        ref_id: i32,
        /// Position of the out-of-order record
        pos: i32,
        /// Position of the group it should not precede
        previous_pos: i32,
    },

    /// A reference reappeared after records from another reference
    #[error("Input is not sorted: reference {ref_id} seen again at '{read_name}' after other references")]
    ReferenceRevisited {
        /// Query name of the record that revisits the reference
        read_name: String,
        /// The revisited reference index
        ref_id: i32,
    },

    /// A reference appeared below the one being processed, or a placed record
    /// followed unplaced ones (`previous_ref_id` of -1)
    #[error(
        "Input is not sorted: '{read_name}' on reference {ref_id} follows records on reference {previous_ref_id}"
    )]
    ReferenceOutOfOrder {
        /// Query name of the out-of-order record
        read_name: String,
        /// Reference index of the out-of-order record
        ref_id: i32,
        /// Reference index of the records it should not follow
        previous_ref_id: i32,
    },

    /// Raw record layout, CIGAR or allocation failure
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Reading an input record failed
    #[error("Failed to read record: {0}")]
    Source(#[source] std::io::Error),

    /// Writing an output record failed
    #[error("Failed to write record: {0}")]
    Sink(#[source] std::io::Error),
}

/// Query name of `record` for error messages, with invalid UTF-8 replaced.
pub(crate) fn read_name_of(record: &RawRecord) -> String {
    record.query_name().to_str_lossy().into_owned()
}

impl FraguniqError {
    /// True for allocation failures in the record layer.
    #[must_use]
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::Record(RecordError::Allocation { .. }))
    }
}
