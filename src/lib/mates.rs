//! Mate detection and the streaming mate merger.
//!
//! Records arrive in coordinate order, so the two mates of a short fragment
//! usually sit next to each other. [`MateMerger`] holds at most one pending
//! record and merges it with the next record when the two are mates.

use fraguniq_raw_bam::RawRecord;
use log::debug;

use crate::bam_io::{RecordSink, RecordSource};
use crate::errors::{FraguniqError, Result, read_name_of};
use crate::merge::{
    correct_cigar, keep_better_end, merge_non_overlap, merge_overlap, truncate_overlap,
};
use crate::metrics::MateMergeMetrics;
use crate::progress::ProgressTracker;
use crate::validation::validate_record;

/// True when the names match after dropping `suffix_len` trailing bytes from
/// each. Names of different lengths never match.
#[must_use]
pub fn same_name(a: &RawRecord, b: &RawRecord, suffix_len: usize) -> bool {
    let (x, y) = (a.query_name(), b.query_name());
    if x.len() != y.len() {
        return false;
    }
    let keep = x.len().saturating_sub(suffix_len);
    x[..keep] == y[..keep]
}

/// True when `a` points at `b` as its mate and the two lie on opposite strands.
#[must_use]
pub fn are_mates(a: &RawRecord, b: &RawRecord) -> bool {
    a.mate_ref_id() == b.ref_id() && a.mate_pos() == b.pos() && a.is_reverse() != b.is_reverse()
}

fn offset_u32(rec: &RawRecord, field: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| FraguniqError::MalformedRecord {
        read_name: read_name_of(rec),
        field,
        reason: format!("offset {value} is out of range"),
    })
}

/// Merge forward mate `one` with reverse mate `two` into `dst`.
///
/// The policy follows the geometry of the pair:
///
/// ```text
/// one  |=========>            spacer >= 0     non-overlapping
/// two               <=====|
///
/// one  |=========>            head > 0        overlapping
/// two       <=========|
///
/// one  |=========>            head == 0       keep the better end
/// two  <======|
///
/// one     |=========>         head < 0        truncate `one` to the part
/// two  <======|                               before `two` ends
/// ```
///
/// Returns the fragment length `two.end - one.pos`. A non-positive length
/// means `two` ends before `one` starts; nothing is written to `dst` then.
///
/// # Errors
/// Returns an error if a merge policy fails (missing tags, a CIGAR without
/// reference-consuming ops, allocation).
pub fn merge_mates(one: &RawRecord, two: &RawRecord, dst: &mut RawRecord) -> Result<i64> {
    let one_pos = i64::from(one.pos());
    let two_pos = i64::from(two.pos());
    let frag_len = two.end_position() - one_pos;

    let spacer = two_pos - one.end_position();
    if spacer >= 0 {
        merge_non_overlap(one, two, offset_u32(one, "pos", spacer)?, dst)?;
    } else {
        let head = two_pos - one_pos;
        if head > 0 {
            merge_overlap(one, two, offset_u32(one, "pos", head)?, dst)?;
        } else if head == 0 {
            keep_better_end(one, two, dst)?;
        } else if frag_len > 0 {
            truncate_overlap(one, offset_u32(one, "pos", frag_len)?, dst)?;
        } else {
            return Ok(frag_len);
        }
    }
    correct_cigar(dst)?;
    Ok(frag_len)
}

/// Streaming mate merger over a coordinate-sorted record stream.
pub struct MateMerger {
    max_frag_len: i64,
    suffix_len: usize,
    pending: Option<RawRecord>,
    fragment: RawRecord,
    metrics: MateMergeMetrics,
}

impl MateMerger {
    /// Fragments of `max_frag_len` or more are written as two records.
    #[must_use]
    pub fn new(max_frag_len: u32, suffix_len: usize) -> Self {
        Self {
            max_frag_len: i64::from(max_frag_len),
            suffix_len,
            pending: None,
            fragment: RawRecord::new(),
            metrics: MateMergeMetrics::default(),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &MateMergeMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn into_metrics(self) -> MateMergeMetrics {
        self.metrics
    }

    /// Take the next record, writing whatever it completes to `sink`.
    ///
    /// # Errors
    /// Returns merge errors and [`FraguniqError::Sink`] on write failure.
    pub fn push<S: RecordSink + ?Sized>(&mut self, record: RawRecord, sink: &mut S) -> Result<()> {
        self.metrics.records_in += 1;
        let Some(pending) = self.pending.take() else {
            self.pending = Some(record);
            return Ok(());
        };

        if !(same_name(&pending, &record, self.suffix_len) && are_mates(&pending, &record)) {
            self.write_single(&pending, sink)?;
            self.pending = Some(record);
            return Ok(());
        }

        self.metrics.pairs_seen += 1;
        let (one, two) = if pending.is_reverse() { (&record, &pending) } else { (&pending, &record) };
        let frag_len = merge_mates(one, two, &mut self.fragment)?;
        if frag_len > 0 && frag_len < self.max_frag_len {
            sink.write(&self.fragment).map_err(FraguniqError::Sink)?;
            self.metrics.pairs_merged += 1;
        } else {
            debug!(
                "Writing mates of '{}' separately (fragment length {frag_len})",
                read_name_of(&pending)
            );
            self.write_single(&pending, sink)?;
            self.write_single(&record, sink)?;
        }
        Ok(())
    }

    /// Write the pending record, if any.
    ///
    /// # Errors
    /// Returns [`FraguniqError::Sink`] on write failure.
    pub fn finish<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            self.write_single(&pending, sink)?;
        }
        Ok(())
    }

    fn write_single<S: RecordSink + ?Sized>(&mut self, record: &RawRecord, sink: &mut S) -> Result<()> {
        sink.write(record).map_err(FraguniqError::Sink)?;
        self.metrics.singles += 1;
        Ok(())
    }
}

/// Merge mates from `source`, writing fragments and unmerged records to `sink`.
///
/// # Errors
/// Returns the first read, validation, merge or write error.
pub fn merge_mate_stream<Src, Snk>(
    source: &mut Src,
    sink: &mut Snk,
    mut merger: MateMerger,
) -> Result<MateMergeMetrics>
where
    Src: RecordSource + ?Sized,
    Snk: RecordSink + ?Sized,
{
    let mut progress = ProgressTracker::new("Processed records").with_interval(1_000_000);
    while let Some(record) = source.read()? {
        validate_record(&record, source.target_lengths())?;
        merger.push(record, sink)?;
        progress.log_if_needed(1);
    }
    merger.finish(sink)?;
    progress.log_final();
    Ok(merger.into_metrics())
}
