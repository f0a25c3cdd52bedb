//! Scripted upstream source shared by the cache tests

use crate::source::{SourceResult, TelemetrySource};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tlmcache_common::time::{format_utc, parse_utc};
use tlmcache_common::{Ert, FrameSample, TimeInterval};

/// Midnight of the given 2025 day of year
pub fn day(doy: u32) -> DateTime<Utc> {
    parse_utc(&format!("2025-{doy:03}T00:00:00")).unwrap()
}

pub fn interval(start_doy: u32, stop_doy: u32) -> TimeInterval {
    TimeInterval::new(day(start_doy), day(stop_doy)).unwrap()
}

/// What a [`MockSource`] has been asked to do, visible to the test after the
/// source has been moved into a cache
#[derive(Debug, Default)]
pub struct MockLog {
    pub calls: Vec<TimeInterval>,
    pub connects: usize,
    pub disconnects: usize,
    /// Calls whose range starts here fail
    pub fail_from: Option<DateTime<Utc>>,
    /// Calls whose range starts here return every sample regardless of the
    /// requested range
    pub ignore_range_from: Option<DateTime<Utc>>,
}

/// Source holding one sample every six hours across the first days of 2025
pub struct MockSource {
    samples: Vec<FrameSample>,
    log: Arc<Mutex<MockLog>>,
}

impl MockSource {
    pub fn new() -> (Self, Arc<Mutex<MockLog>>) {
        let base = day(1);
        let samples = (0..4 * 12)
            .map(|i| {
                let ert = base + Duration::hours(6 * i);
                FrameSample::new(u32::try_from(i).unwrap(), 0, Ert::Utc(format_utc(&ert)))
            })
            .collect();
        let log = Arc::new(Mutex::new(MockLog::default()));
        (
            Self {
                samples,
                log: Arc::clone(&log),
            },
            log,
        )
    }

    /// Samples the source holds in `[start, stop)`
    pub fn expected(start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<FrameSample> {
        let (source, _) = Self::new();
        source
            .samples
            .into_iter()
            .filter(|fs| {
                let t = fs.ert_time().unwrap();
                start <= t && t < stop
            })
            .collect()
    }
}

impl TelemetrySource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&mut self) -> SourceResult<()> {
        self.log.lock().connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> SourceResult<()> {
        self.log.lock().disconnects += 1;
        Ok(())
    }

    fn get_samples_in_range(
        &mut self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> SourceResult<Vec<FrameSample>> {
        let mut log = self.log.lock();
        log.calls.push(TimeInterval::new(start, stop)?);
        if log.fail_from == Some(start) {
            let msg = format!("upstream unavailable for range starting {}", format_utc(&start));
            return Err(msg.into());
        }
        if log.ignore_range_from == Some(start) {
            return Ok(self.samples.clone());
        }
        Ok(self
            .samples
            .iter()
            .filter(|fs| fs.ert_time().is_ok_and(|t| start <= t && t < stop))
            .cloned()
            .collect())
    }
}
