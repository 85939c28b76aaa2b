//! Integration tests for fraguniq.
//!
//! These tests write real BAM files, run the library entry points and the
//! `fraguniq` binary over them, and read the results back.

mod helpers;
mod test_bam_roundtrip;
mod test_merge_command;
mod test_uniq_command;
