//! Telemetry cache entry point
//!
//! [`TelemetryCache`] opens (or creates) the cache file, builds the range
//! cache over it and serializes every public operation through one lock.
//! The lock is held for the whole call, including any upstream fetch.

use crate::error::CacheResult;
use crate::range_cache::RangeCache;
use crate::source::TelemetrySource;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tlmcache_common::{CacheConfig, FrameSample, TimeInterval};
use tlmcache_store::SampleStore;
use tracing::info;

/// Statistics key: number of samples in the cache file
pub const STAT_SAMPLE_COUNT: &str = "Number of cached FrameSamples";
/// Statistics key: listing of covered ERT ranges
pub const STAT_COVERED_RANGES: &str = "Queried time ranges (ERT) contained in cache";
/// Statistics key: cache file size
pub const STAT_SIZE_KB: &str = "Cache size on disk (kB)";
/// Statistics key: upstream calls made through this instance
pub const STAT_UPSTREAM_FETCHES: &str = "Upstream fetches by this instance";

/// Persistent cache in front of a telemetry source
pub struct TelemetryCache<S> {
    path: PathBuf,
    source_name: String,
    inner: Mutex<RangeCache<S>>,
}

impl<S: TelemetrySource> TelemetryCache<S> {
    /// Open the cache file at `path`, creating it if it does not exist
    pub fn open(source: S, path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = SampleStore::open(&path)?;
        if store.created() {
            info!(path = %path.display(), "Created new telemetry cache");
        } else {
            info!(path = %path.display(), "Opened existing telemetry cache");
        }

        let source_name = source.name().to_string();
        let inner = RangeCache::new(source, store)?;
        Ok(Self {
            path,
            source_name,
            inner: Mutex::new(inner),
        })
    }

    /// Open the cache file named by the configuration
    pub fn open_with_config(source: S, config: &CacheConfig) -> CacheResult<Self> {
        Self::open(source, &config.cache_file_path)
    }

    /// All samples whose ERT falls in `[start, stop)`
    pub fn get_samples_in_range(
        &self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> CacheResult<Vec<FrameSample>> {
        let interval = TimeInterval::new(start, stop)?;
        self.inner.lock().get_samples_in_range(&interval)
    }

    /// Human-readable cache statistics
    pub fn get_cache_statistics(&self) -> CacheResult<BTreeMap<String, String>> {
        let inner = self.inner.lock();
        let mut stats = BTreeMap::new();

        stats.insert(STAT_SAMPLE_COUNT.to_string(), inner.store().count()?.to_string());

        let mut listing = String::new();
        for range in inner.coverage().all_covered() {
            let _ = write!(listing, "\n\t- {range}");
        }
        stats.insert(STAT_COVERED_RANGES.to_string(), listing);

        stats.insert(
            STAT_SIZE_KB.to_string(),
            (inner.store().file_size_bytes()? / 1024).to_string(),
        );
        stats.insert(
            STAT_UPSTREAM_FETCHES.to_string(),
            inner.stats().upstream_fetches().to_string(),
        );
        Ok(stats)
    }

    pub fn connect_source(&self) -> CacheResult<()> {
        self.inner.lock().connect_source()
    }

    pub fn disconnect_source(&self) -> CacheResult<()> {
        self.inner.lock().disconnect_source()
    }

    /// The currently covered ERT ranges
    pub fn covered_ranges(&self) -> Vec<TimeInterval> {
        self.inner.lock().coverage().all_covered()
    }

    /// Name of the wrapped source
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the cache, giving back the upstream source
    pub fn into_source(self) -> S {
        self.inner.into_inner().into_source()
    }
}
