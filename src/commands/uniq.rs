//! Duplicate removal command.
//!
//! Streams a coordinate-sorted BAM, keeps one read per (start, end, strand)
//! sub-group and optionally writes run statistics and a sub-group size
//! histogram.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fraguniq_lib::bam_io::{create_raw_bam_reader, create_raw_bam_writer};
use fraguniq_lib::logging::{OperationTimer, log_uniq_summary};
use fraguniq_lib::metrics::{write_histogram_report, write_stats_report};
use fraguniq_lib::uniq::{DuplicateGrouper, remove_duplicates};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::commands::command::Command;
use crate::commands::common::{
    BamIoOptions, prepare_output_header, warn_unless_coordinate_sorted,
};

/// Remove duplicate reads from a coordinate-sorted BAM.
#[derive(Debug, Parser)]
#[command(
    name = "uniq",
    about = "\x1b[38;5;72m[DEDUPLICATION]\x1b[0m  \x1b[36mRemove reads sharing start, end and strand\x1b[0m",
    long_about = r#"
Remove duplicate reads from a coordinate-sorted BAM file.

Reads sharing a reference and start position are split into sub-groups with
the same end position and strand. One read per sub-group is kept, chosen at
random; the others are dropped. Unmapped reads are kept unchanged in their
place in the stream.

The input must be sorted by coordinate. A position lower than the previous one
on the same reference, a reference out of header order, or a placed read after
the unplaced ones stops the run with an error.

Example usage:
  fraguniq uniq -i sorted.bam -o uniq.bam --stats uniq.stats --hist uniq.hist --seed 408
"#
)]
pub struct Uniq {
    /// Input/output BAM options
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Output file for read and base counts before and after deduplication
    #[arg(short = 's', long = "stats")]
    pub stats: Option<PathBuf>,

    /// Output file for the duplicate sub-group size histogram
    #[arg(short = 'H', long = "hist")]
    pub hist: Option<PathBuf>,

    /// Random seed for reproducible representative choice
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Tag kept reads with their sub-group size in DU
    #[arg(long = "add-count", default_value = "false")]
    pub add_count: bool,
}

impl Command for Uniq {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;

        let timer = OperationTimer::new("Removing duplicates");

        info!("Input: {}", self.io.input.display());
        info!("Output: {}", self.io.output.display());
        if let Some(seed) = self.seed {
            info!("Random seed: {seed}");
        }
        if self.add_count {
            info!("Tagging kept reads with DU");
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let grouper = DuplicateGrouper::new(rng).with_duplicate_count(self.add_count);

        let (mut reader, header) = create_raw_bam_reader(&self.io.input, self.io.threads)?;
        warn_unless_coordinate_sorted(&header);
        let header = prepare_output_header(header, command_line)?;
        let mut writer = create_raw_bam_writer(&self.io.output, &header, self.io.threads)?;

        let metrics = remove_duplicates(&mut reader, &mut writer, grouper)
            .with_context(|| format!("Failed to remove duplicates from {}", self.io.input.display()))?;
        writer
            .finish()
            .with_context(|| format!("Failed to finish output BAM: {}", self.io.output.display()))?;

        if let Some(path) = &self.stats {
            write_stats_report(path, &metrics)?;
            info!("Wrote statistics to: {}", path.display());
        }
        if let Some(path) = &self.hist {
            write_histogram_report(path, &metrics)?;
            info!("Wrote histogram to: {}", path.display());
        }

        log_uniq_summary(&metrics);
        timer.log_completion(metrics.input.reads);
        Ok(())
    }
}
