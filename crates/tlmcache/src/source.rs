//! Upstream telemetry source interface

use chrono::{DateTime, Utc};
use tlmcache_common::FrameSample;

/// Error type returned by telemetry sources
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

pub type SourceResult<T> = Result<T, SourceError>;

/// A source of frame samples, typically a ground data system query
/// interface.
///
/// Implementations are called synchronously and may block.
pub trait TelemetrySource {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Open any connection the source needs
    fn connect(&mut self) -> SourceResult<()> {
        Ok(())
    }

    /// Release resources acquired by [`connect`](Self::connect)
    fn disconnect(&mut self) -> SourceResult<()> {
        Ok(())
    }

    /// All samples whose ERT falls in `[start, stop)`
    fn get_samples_in_range(
        &mut self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> SourceResult<Vec<FrameSample>>;
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn connect(&mut self) -> SourceResult<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> SourceResult<()> {
        (**self).disconnect()
    }

    fn get_samples_in_range(
        &mut self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> SourceResult<Vec<FrameSample>> {
        (**self).get_samples_in_range(start, stop)
    }
}
