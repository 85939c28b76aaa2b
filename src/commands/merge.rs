//! Mate merging command.
//!
//! Mates that sit next to each other in the input, as in mapper output or
//! name-grouped BAMs, are merged into one record spanning the whole fragment
//! when the fragment is shorter than `--max-frag-len`.

use anyhow::{Context, Result};
use clap::Parser;
use fraguniq_lib::bam_io::{create_raw_bam_reader, create_raw_bam_writer};
use fraguniq_lib::logging::{OperationTimer, log_merge_summary};
use fraguniq_lib::mates::{MateMerger, merge_mate_stream};
use fraguniq_lib::validation::validate_positive;
use log::info;

use crate::commands::command::Command;
use crate::commands::common::{BamIoOptions, prepare_output_header};

/// Merge paired mates into single fragment records.
#[derive(Debug, Parser)]
#[command(
    name = "merge",
    about = "\x1b[38;5;180m[FRAGMENTS]\x1b[0m      \x1b[36mMerge mates into single fragment records\x1b[0m",
    long_about = r#"
Merge the two mates of each read pair into one record covering the fragment.

Mates must be adjacent in the input, the reverse mate directly after the
forward mate, as a mapper writes them or as in a BAM grouped by read name. A
coordinate-sorted BAM usually separates mates and leaves most pairs unmerged.
Depending on how the mates lie on the reference, the merged record
joins them with a reference skip, fuses their overlap, keeps the mate with the
longer alignment, or trims the forward mate to the fragment.

The merged record sums the NM tags of both mates and keeps the CV tag of the
forward mate; both tags must be present. Pairs whose fragment is not shorter
than --max-frag-len, and reads without an adjacent mate, are written
unchanged.

Example usage:
  fraguniq merge -i mapped.bam -o fragments.bam --max-frag-len 2000 --suffix-len 2
"#
)]
pub struct Merge {
    /// Input/output BAM options
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Fragments of this length or longer are written as two records
    #[arg(short = 'm', long = "max-frag-len", default_value = "10000")]
    pub max_frag_len: u32,

    /// Trailing read-name characters to ignore when pairing mates (e.g. 2 for /1 and /2)
    #[arg(long = "suffix-len", default_value = "0")]
    pub suffix_len: usize,
}

impl Command for Merge {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        validate_positive(self.max_frag_len, "max-frag-len")?;

        let timer = OperationTimer::new("Merging mates");

        info!("Input: {}", self.io.input.display());
        info!("Output: {}", self.io.output.display());
        info!("Maximum fragment length: {}", self.max_frag_len);
        if self.suffix_len > 0 {
            info!("Ignoring {} trailing read-name characters", self.suffix_len);
        }

        let (mut reader, header) = create_raw_bam_reader(&self.io.input, self.io.threads)?;
        let header = prepare_output_header(header, command_line)?;
        let mut writer = create_raw_bam_writer(&self.io.output, &header, self.io.threads)?;

        let merger = MateMerger::new(self.max_frag_len, self.suffix_len);
        let metrics = merge_mate_stream(&mut reader, &mut writer, merger)
            .with_context(|| format!("Failed to merge mates from {}", self.io.input.display()))?;
        writer
            .finish()
            .with_context(|| format!("Failed to finish output BAM: {}", self.io.output.display()))?;

        log_merge_summary(&metrics);
        timer.log_completion(metrics.records_in);
        Ok(())
    }
}
