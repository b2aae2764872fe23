//! Progress reporting and timing helpers.

use std::time::Duration;

use log::debug;

/// Records between progress marks.
pub const DEFAULT_MARK_EVERY: usize = 10_000;

/// Counts processed records and logs a mark every `every` records.
#[derive(Debug, Clone)]
pub struct ProgressCounter {
    label: String,
    every: usize,
    count: usize,
}

impl ProgressCounter {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self::with_interval(label, DEFAULT_MARK_EVERY)
    }

    #[must_use]
    pub fn with_interval(label: &str, every: usize) -> Self {
        Self {
            label: label.to_string(),
            every: every.max(1),
            count: 0,
        }
    }

    /// Counts one record; returns true when a mark was logged.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count % self.every == 0 {
            debug!("{}: {} records", self.label, self.count);
            return true;
        }
        false
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self, label: &str) {
        self.label = label.to_string();
        self.count = 0;
    }
}

/// Formats a duration as HH:MM:SS.d (tenths of a second).
#[must_use]
pub fn format_elapsed(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let tenths = d.subsec_millis() / 100;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{tenths}")
}
