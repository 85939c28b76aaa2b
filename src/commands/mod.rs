//! CLI command implementations for fraguniq.
//!
//! - [`uniq`] - remove duplicate reads from a coordinate-sorted BAM
//! - [`merge`] - merge overlapping or nearby mates into single fragments

// Blanket clippy pedantic allows for command implementations.
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value
)]

pub mod command;
pub mod common;
pub mod merge;
pub mod uniq;
