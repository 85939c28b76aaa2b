//! Metrics collection and reporting for fraguniq operations.
//!
//! - [`uniq`] - Duplicate-removal counters and the duplicate-count histogram
//! - [`merge`] - Mate-merging counters
//! - [`writer`] - Statistics and histogram report files

pub mod merge;
pub mod uniq;
pub mod writer;

pub use merge::MateMergeMetrics;
pub use uniq::{ReadStats, UniqMetrics};
pub use writer::{format_general, write_histogram_report, write_stats_report};
