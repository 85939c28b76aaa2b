//! Raw alignment-record bytes: field access, CIGAR algebra, packed
//! sequences, tags and record synthesis.
#![deny(unsafe_code)]

pub mod builder;
pub mod cigar;
pub mod error;
pub mod fields;
pub mod record;
pub mod sequence;
pub mod tags;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

// Flat re-exports: callers use fraguniq_raw_bam::reference_span() etc.
pub use builder::*;
pub use cigar::*;
pub use error::*;
pub use fields::*;
pub use record::*;
pub use sequence::*;
pub use tags::*;

#[cfg(any(test, feature = "test-utils"))]
pub use testutil::*;
