//! Streaming duplicate removal over coordinate-sorted records.
//!
//! Records sharing a start `(tid, pos)` are buffered. When the start changes,
//! the buffer is split into sub-groups sharing the same end position and
//! strand, and one record per sub-group is written, chosen uniformly at
//! random.
//!
//! ```text
//! start 1000:  A 1000-1050 +   B 1000-1050 +   C 1000-1060 +   D 1000-1050 -
//!              \____________ one of A/B ____/  \__ C ___/      \__ D ___/
//! ```

use std::collections::HashSet;

use fraguniq_raw_bam::{RawRecord, flags::UNMAPPED};
use log::debug;
use rand::Rng;

use crate::bam_io::{RecordSink, RecordSource};
use crate::errors::{FraguniqError, Result, read_name_of as read_name};
use crate::metrics::UniqMetrics;
use crate::progress::ProgressTracker;
use crate::validation::validate_record;

/// Duplicate-count tag written on representatives when requested.
pub const DU_TAG: [u8; 2] = *b"DU";

/// Groups duplicates by start, end and strand and keeps one per group.
pub struct DuplicateGrouper<R> {
    rng: R,
    add_count: bool,
    current: Option<(i32, i32)>,
    buffer: Vec<RawRecord>,
    refs_seen: HashSet<i32>,
    unplaced_seen: bool,
    metrics: UniqMetrics,
}

impl<R: Rng> DuplicateGrouper<R> {
    /// Create a grouper drawing representatives from `rng`.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            add_count: false,
            current: None,
            buffer: Vec::new(),
            refs_seen: HashSet::new(),
            unplaced_seen: false,
            metrics: UniqMetrics::new(),
        }
    }

    /// Tag each written representative with its sub-group size (`DU`).
    #[must_use]
    pub fn with_duplicate_count(mut self, add_count: bool) -> Self {
        self.add_count = add_count;
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &UniqMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn into_metrics(self) -> UniqMetrics {
        self.metrics
    }

    /// Take the next record in stream order.
    ///
    /// Records without a reference (`tid < 0`) flush the buffered group and
    /// are then written straight through as groups of one. Unmapped records
    /// placed on a reference are ordered like mapped ones but never collapsed.
    ///
    /// # Errors
    /// Returns [`FraguniqError::UnsortedInput`] if the record starts before
    /// the buffered group on the same reference,
    /// [`FraguniqError::ReferenceRevisited`] if its reference was already
    /// left behind, [`FraguniqError::ReferenceOutOfOrder`] if its reference
    /// sorts before the current one or follows unplaced records, and
    /// [`FraguniqError::Sink`] if a flush fails to write.
    pub fn push<S: RecordSink + ?Sized>(&mut self, record: RawRecord, sink: &mut S) -> Result<()> {
        self.metrics.input.update(&record);

        if record.ref_id() < 0 {
            self.flush(sink)?;
            self.current = None;
            self.unplaced_seen = true;
            return self.write_single(&record, sink);
        }
        if self.unplaced_seen {
            return Err(FraguniqError::ReferenceOutOfOrder {
                read_name: read_name(&record),
                ref_id: record.ref_id(),
                previous_ref_id: -1,
            });
        }

        let key = (record.ref_id(), record.pos());
        if let Some((tid, pos)) = self.current {
            if key == (tid, pos) {
                self.buffer.push(record);
                return Ok(());
            }
            if key.0 == tid && key.1 < pos {
                return Err(FraguniqError::UnsortedInput {
                    read_name: read_name(&record),
                    ref_id: tid,
                    pos: key.1,
                    previous_pos: pos,
                });
            }
            if key.0 != tid && self.refs_seen.contains(&key.0) {
                return Err(FraguniqError::ReferenceRevisited {
                    read_name: read_name(&record),
                    ref_id: key.0,
                });
            }
            if key.0 < tid {
                return Err(FraguniqError::ReferenceOutOfOrder {
                    read_name: read_name(&record),
                    ref_id: key.0,
                    previous_ref_id: tid,
                });
            }
            self.flush(sink)?;
        }

        self.refs_seen.insert(key.0);
        self.current = Some(key);
        self.buffer.push(record);
        Ok(())
    }

    /// Flush the last group.
    ///
    /// # Errors
    /// Returns [`FraguniqError::Sink`] if a record cannot be written.
    pub fn finish<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        self.flush(sink)?;
        self.current = None;
        Ok(())
    }

    fn flush<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let (unmapped, mut group): (Vec<RawRecord>, Vec<RawRecord>) =
            std::mem::take(&mut self.buffer).into_iter().partition(|r| r.flags() & UNMAPPED != 0);
        group.sort_by_cached_key(|r| (r.end_position(), r.is_reverse()));

        for run in group.chunk_by_mut(|a, b| {
            a.end_position() == b.end_position() && a.is_reverse() == b.is_reverse()
        }) {
            let size = run.len();
            let representative = &mut run[self.rng.random_range(0..size)];
            if self.add_count {
                representative.update_int_tag(&DU_TAG, i32::try_from(size).unwrap_or(i32::MAX))?;
            }
            sink.write(representative).map_err(FraguniqError::Sink)?;
            self.metrics.output.update(representative);
            self.metrics.record_group(size);
        }

        for record in &unmapped {
            self.write_single(record, sink)?;
        }

        group.clear();
        self.buffer = group;
        Ok(())
    }

    fn write_single<S: RecordSink + ?Sized>(&mut self, record: &RawRecord, sink: &mut S) -> Result<()> {
        sink.write(record).map_err(FraguniqError::Sink)?;
        self.metrics.output.update(record);
        self.metrics.record_group(1);
        Ok(())
    }
}

/// Remove duplicates from `source`, writing survivors to `sink`.
///
/// Every record is checked against the header's reference lengths before it
/// is grouped.
///
/// # Errors
/// Returns the first read, validation, ordering or write error.
pub fn remove_duplicates<Src, Snk, R>(
    source: &mut Src,
    sink: &mut Snk,
    mut grouper: DuplicateGrouper<R>,
) -> Result<UniqMetrics>
where
    Src: RecordSource + ?Sized,
    Snk: RecordSink + ?Sized,
    R: Rng,
{
    let mut progress = ProgressTracker::new("Processed records").with_interval(1_000_000);
    while let Some(record) = source.read()? {
        validate_record(&record, source.target_lengths())?;
        grouper.push(record, sink)?;
        progress.log_if_needed(1);
    }
    grouper.finish(sink)?;
    progress.log_final();

    let metrics = grouper.into_metrics();
    debug!(
        "Kept {} of {} records in {} duplicated sub-groups",
        metrics.output.reads, metrics.input.reads, metrics.reads_duped
    );
    Ok(metrics)
}
