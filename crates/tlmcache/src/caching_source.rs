//! Cache exposed as a telemetry source

use crate::facade::TelemetryCache;
use crate::source::{SourceResult, TelemetrySource};
use chrono::{DateTime, Utc};
use tlmcache_common::FrameSample;

/// A [`TelemetrySource`] that answers through a [`TelemetryCache`], so code
/// written against a plain source can use a cached one unchanged.
pub struct CachingTelemetrySource<S> {
    cache: TelemetryCache<S>,
}

impl<S: TelemetrySource> CachingTelemetrySource<S> {
    pub const fn new(cache: TelemetryCache<S>) -> Self {
        Self { cache }
    }

    pub const fn cache(&self) -> &TelemetryCache<S> {
        &self.cache
    }

    pub fn into_cache(self) -> TelemetryCache<S> {
        self.cache
    }
}

impl<S: TelemetrySource> TelemetrySource for CachingTelemetrySource<S> {
    fn name(&self) -> &str {
        self.cache.source_name()
    }

    fn connect(&mut self) -> SourceResult<()> {
        Ok(self.cache.connect_source()?)
    }

    fn disconnect(&mut self) -> SourceResult<()> {
        Ok(self.cache.disconnect_source()?)
    }

    fn get_samples_in_range(
        &mut self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> SourceResult<Vec<FrameSample>> {
        Ok(self.cache.get_samples_in_range(start, stop)?)
    }
}
