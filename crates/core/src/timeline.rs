//! Timeline helpers
//!
//! Event timestamps are signed microseconds since 1970-01-01 00:00:00 UTC.

use chrono::Utc;

/// Current wall-clock time in microseconds since epoch
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Inclusive range of event timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Lower bound, inclusive
    pub start: i64,
    /// Upper bound, inclusive
    pub end: i64,
}

impl TimeRange {
    /// Create a range; `None` if `start` is after `end`
    pub fn new(start: i64, end: i64) -> Option<Self> {
        (start <= end).then_some(TimeRange { start, end })
    }

    /// Whether a timestamp falls inside the range
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}
