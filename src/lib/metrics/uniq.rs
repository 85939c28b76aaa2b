//! Duplicate-removal metrics.

use std::collections::BTreeMap;

use fraguniq_raw_bam::RawRecord;

/// Read and base counts for one side of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadStats {
    pub reads: u64,
    /// Query bases, counted from the CIGAR.
    pub bases: u64,
}

impl ReadStats {
    pub fn update(&mut self, record: &RawRecord) {
        self.reads += 1;
        self.bases += u64::from(fraguniq_raw_bam::query_span(&record.cigar()));
    }
}

/// Counters for a duplicate-removal run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UniqMetrics {
    /// Every record read.
    pub input: ReadStats,
    /// Every record written.
    pub output: ReadStats,
    /// Sub-groups that held more than one record.
    pub reads_duped: u64,
    /// Records dropped as duplicates (`size - 1` per sub-group).
    pub excess_duplicates: u64,
    /// Sub-group size to number of sub-groups of that size.
    pub histogram: BTreeMap<usize, u64>,
}

impl UniqMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one emitted sub-group of `size` records.
    pub fn record_group(&mut self, size: usize) {
        *self.histogram.entry(size).or_insert(0) += 1;
        if size > 1 {
            self.reads_duped += 1;
            self.excess_duplicates += size as u64 - 1;
        }
    }

    /// Records read but not written.
    #[must_use]
    pub fn reads_removed(&self) -> u64 {
        self.input.reads.saturating_sub(self.output.reads)
    }

    /// `(unique reads - duplicated sub-groups) / total reads`; 0 with no input.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn non_duplicate_fraction(&self) -> f64 {
        if self.input.reads == 0 {
            return 0.0;
        }
        (self.output.reads as f64 - self.reads_duped as f64) / self.input.reads as f64
    }

    /// `(removed + duplicated sub-groups) / duplicated sub-groups`; 0 when
    /// nothing was duplicated.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duplication_rate(&self) -> f64 {
        if self.reads_duped == 0 {
            return 0.0;
        }
        (self.reads_removed() + self.reads_duped) as f64 / self.reads_duped as f64
    }

    /// Sum of `size * count` over the histogram.
    #[must_use]
    pub fn histogram_reads(&self) -> u64 {
        self.histogram.iter().map(|(&size, &count)| size as u64 * count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraguniq_raw_bam::{encode_op, make_bam_bytes};

    #[test]
    fn test_read_stats_counts_query_bases() {
        let ops = [encode_op(4, 3), encode_op(0, 20), encode_op(2, 5), encode_op(1, 2)];
        let rec = RawRecord::from_bytes(make_bam_bytes(0, 0, 0, b"r", &ops, 25, -1, -1, &[])).unwrap();
        let mut stats = ReadStats::default();
        stats.update(&rec);
        stats.update(&rec);
        assert_eq!(stats, ReadStats { reads: 2, bases: 50 });
    }

    #[test]
    fn test_record_group() {
        let mut m = UniqMetrics::new();
        m.record_group(2);
        m.record_group(1);
        m.record_group(4);
        m.record_group(1);
        assert_eq!(m.histogram.get(&1), Some(&2));
        assert_eq!(m.histogram.get(&2), Some(&1));
        assert_eq!(m.histogram.get(&4), Some(&1));
        assert_eq!(m.reads_duped, 2);
        assert_eq!(m.excess_duplicates, 4);
        assert_eq!(m.histogram_reads(), 8);
    }

    #[test]
    fn test_derived_rates() {
        let mut m = UniqMetrics::new();
        m.input = ReadStats { reads: 10, bases: 1000 };
        m.output = ReadStats { reads: 6, bases: 600 };
        m.reads_duped = 2;
        assert_eq!(m.reads_removed(), 4);
        assert!((m.non_duplicate_fraction() - 0.4).abs() < 1e-12);
        assert!((m.duplication_rate() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rates_without_input_or_duplicates() {
        let m = UniqMetrics::new();
        assert!(m.non_duplicate_fraction().abs() < f64::EPSILON);
        assert!(m.duplication_rate().abs() < f64::EPSILON);
    }
}
