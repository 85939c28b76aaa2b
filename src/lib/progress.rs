//! Periodic progress logging for record streams.

use log::info;

/// Logs a running count each time it crosses a multiple of the interval.
///
/// # Example
/// ```
/// use fraguniq_lib::progress::ProgressTracker;
///
/// let mut tracker = ProgressTracker::new("Processed records").with_interval(100);
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Processed records 250 (complete)"
/// ```
#[derive(Debug)]
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: u64,
}

impl ProgressTracker {
    /// Create a tracker with the default interval of 1,000,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 1_000_000, message: message.into(), count: 0 }
    }

    /// Set the logging interval; zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Add to the count, logging every interval boundary crossed.
    ///
    /// Returns `true` when the new count sits exactly on a boundary.
    pub fn log_if_needed(&mut self, additional: u64) -> bool {
        let prev = self.count;
        self.count += additional;
        for i in (prev / self.interval + 1)..=(self.count / self.interval) {
            info!("{} {}", self.message, crate::logging::format_count(i * self.interval));
        }
        self.count > 0 && self.count.is_multiple_of(self.interval)
    }

    /// Log the final count unless the last boundary already did.
    pub fn log_final(&self) {
        if self.count > 0 && !self.count.is_multiple_of(self.interval) {
            info!("{} {} (complete)", self.message, crate::logging::format_count(self.count));
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}
