//! Half-open time intervals

use crate::error::{Error, Result};
use crate::time::format_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable `[start, stop)` time interval.
///
/// `start` is always strictly before `stop`. Ordering is by `start`, then by
/// `stop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
}

impl TimeInterval {
    /// Create an interval, failing unless `start < stop`
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self> {
        if start >= stop {
            return Err(Error::InvalidInterval {
                start: format_utc(&start),
                stop: format_utc(&stop),
            });
        }
        Ok(Self { start, stop })
    }

    /// Closed lower bound
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Open upper bound
    #[must_use]
    pub const fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    /// Whether `t` falls inside the interval
    #[must_use]
    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        self.start <= *t && *t < self.stop
    }

    /// Whether the two intervals share any time or meet end to start.
    ///
    /// Such intervals can be merged into one.
    #[must_use]
    pub fn overlaps_or_touches(&self, other: &Self) -> bool {
        self.start <= other.stop && other.start <= self.stop
    }

    /// Smallest interval spanning both
    #[must_use]
    pub fn span(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", format_utc(&self.start), format_utc(&self.stop))
    }
}
