//! Common CLI options shared across commands.
//!
//! Composed into command structs with `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::warn;
use noodles::sam::Header;

use fraguniq_lib::header::{add_program_record, is_coordinate_sorted};
use fraguniq_lib::validation::{validate_file_exists, validate_positive};

use crate::version::VERSION;

/// Input/output options for commands that read a BAM and write a BAM.
#[derive(Debug, Clone, Args)]
pub struct BamIoOptions {
    /// Input BAM file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output BAM file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Threads for BGZF compression and decompression
    #[arg(short = 't', long = "threads", default_value = "1")]
    pub threads: usize,
}

impl BamIoOptions {
    /// Validates that the input file exists and the thread count is positive.
    ///
    /// # Errors
    ///
    /// Returns an error if either check fails.
    pub fn validate(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input BAM")?;
        validate_positive(self.threads, "threads")?;
        Ok(())
    }
}

/// Warn when the header does not declare `SO:coordinate`, returning whether
/// it does.
pub fn warn_unless_coordinate_sorted(header: &Header) -> bool {
    let sorted = is_coordinate_sorted(header);
    if !sorted {
        warn!("Input header does not declare SO:coordinate; records must still arrive sorted");
    }
    sorted
}

/// Append this run's `@PG` record to the input header.
///
/// # Errors
///
/// Returns an error if the program record cannot be added.
pub fn prepare_output_header(header: Header, command_line: &str) -> Result<Header> {
    add_program_record(header, VERSION.as_str(), command_line)
}
