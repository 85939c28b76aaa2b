//! Counters for a mate-merging run.

/// Record and pair counts from [`crate::mates::MateMerger`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MateMergeMetrics {
    /// Records read.
    pub records_in: u64,
    /// Adjacent mate pairs found.
    pub pairs_seen: u64,
    /// Pairs written as one fragment record.
    pub pairs_merged: u64,
    /// Records written as they came in.
    pub singles: u64,
}

impl MateMergeMetrics {
    /// Total records written.
    #[must_use]
    pub fn records_out(&self) -> u64 {
        self.pairs_merged + self.singles
    }

    /// Fraction of mate pairs that became a single record.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn merged_fraction(&self) -> f64 {
        if self.pairs_seen == 0 { 0.0 } else { self.pairs_merged as f64 / self.pairs_seen as f64 }
    }
}
