//! Telemetry range cache
//!
//! Serves time-range queries for frame samples from a local cache file,
//! fetching only the uncovered parts of each query from the upstream
//! telemetry source.
//!
//! - [`CoverageIndex`] tracks which time ranges have been fetched
//! - [`RangeCache`] fetches gaps and serves queries from the store
//! - [`TelemetryCache`] is the locked, externally used entry point
//! - [`CachingTelemetrySource`] exposes a cache as a [`TelemetrySource`]

pub mod caching_source;
pub mod coverage;
pub mod error;
pub mod facade;
pub mod range_cache;
pub mod source;

pub use caching_source::CachingTelemetrySource;
pub use coverage::CoverageIndex;
pub use error::{CacheError, CacheResult};
pub use facade::TelemetryCache;
pub use range_cache::{FetchStats, RangeCache};
pub use source::{SourceError, SourceResult, TelemetrySource};

#[cfg(test)]
pub(crate) mod testutil;
