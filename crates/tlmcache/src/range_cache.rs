//! Gap fetching and query serving
//!
//! [`RangeCache`] is the only component that calls the upstream source. For
//! each query it asks the coverage index for the uncovered gaps, fetches each
//! gap with exactly one upstream call, stores the returned samples, marks the
//! gap covered, persists the coverage snapshot and finally reads the whole
//! query back from the store.

use crate::coverage::CoverageIndex;
use crate::error::{CacheError, CacheResult};
use crate::source::{SourceError, TelemetrySource};
use std::sync::atomic::{AtomicU64, Ordering};
use tlmcache_common::{FrameSample, TimeInterval};
use tlmcache_store::SampleStore;
use tracing::{debug, info, warn};

/// Upstream activity counters
#[derive(Debug, Default)]
pub struct FetchStats {
    upstream_fetches: AtomicU64,
    fetch_failures: AtomicU64,
    samples_fetched: AtomicU64,
}

impl FetchStats {
    /// Upstream calls attempted, including failed ones
    pub fn upstream_fetches(&self) -> u64 {
        self.upstream_fetches.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    /// Samples returned by successful upstream calls
    pub fn samples_fetched(&self) -> u64 {
        self.samples_fetched.load(Ordering::Relaxed)
    }

    fn record_attempt(&self) {
        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_samples(&self, count: usize) {
        self.samples_fetched
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Cache that fills coverage gaps from an upstream source.
///
/// Not synchronized on its own; [`TelemetryCache`](crate::TelemetryCache)
/// wraps it in a lock.
pub struct RangeCache<S> {
    source: S,
    store: SampleStore,
    coverage: CoverageIndex,
    stats: FetchStats,
}

impl<S: TelemetrySource> RangeCache<S> {
    /// Create a cache over an opened store, loading its persisted coverage
    pub fn new(source: S, store: SampleStore) -> CacheResult<Self> {
        let covered = store.read_coverage()?;
        debug!(
            path = %store.path().display(),
            ranges = covered.len(),
            "Loaded cache coverage"
        );
        Ok(Self {
            source,
            store,
            coverage: CoverageIndex::from_intervals(&covered),
            stats: FetchStats::default(),
        })
    }

    /// All samples whose ERT falls in `interval`, fetching uncovered parts
    /// from upstream first.
    ///
    /// Gaps are fetched in ascending order. If one fails, the gaps before it
    /// stay stored and covered, and the error is returned; retrying the same
    /// interval only fetches what is still uncovered.
    pub fn get_samples_in_range(
        &mut self,
        interval: &TimeInterval,
    ) -> CacheResult<Vec<FrameSample>> {
        let gaps = self.coverage.uncovered_within(interval);
        if gaps.is_empty() {
            debug!(interval = %interval, "Query fully covered by cache");
        } else {
            debug!(interval = %interval, gaps = gaps.len(), "Query has uncovered ranges");
        }

        for (done, gap) in gaps.iter().enumerate() {
            if let Err(e) = self.fetch_gap(gap) {
                if done > 0 {
                    self.persist_partial_coverage();
                }
                return Err(e);
            }
        }

        self.store.write_coverage(&self.coverage.all_covered())?;
        Ok(self.store.read_samples(interval)?)
    }

    fn fetch_gap(&mut self, gap: &TimeInterval) -> CacheResult<()> {
        debug!(gap = %gap, source = self.source.name(), "Fetching range from upstream");
        self.stats.record_attempt();

        let samples = match self.source.get_samples_in_range(gap.start(), gap.stop()) {
            Ok(samples) => samples,
            Err(error) => {
                self.stats.record_failure();
                warn!(gap = %gap, source = self.source.name(), "Upstream fetch failed: {}", error);
                return Err(self.upstream_error(error));
            }
        };
        self.stats.record_samples(samples.len());

        self.store.write_samples(&samples)?;
        self.coverage.add(*gap);
        info!(gap = %gap, samples = samples.len(), "Cached range from upstream");
        Ok(())
    }

    // Failures are only logged; the caller gets the fetch error.
    fn persist_partial_coverage(&self) {
        if let Err(e) = self.store.write_coverage(&self.coverage.all_covered()) {
            warn!("Failed to persist coverage after partial fetch: {}", e);
        }
    }

    fn upstream_error(&self, error: SourceError) -> CacheError {
        CacheError::Upstream {
            source_name: self.source.name().to_string(),
            error,
        }
    }

    /// Connect the upstream source
    pub fn connect_source(&mut self) -> CacheResult<()> {
        info!(source = self.source.name(), "Connecting telemetry source");
        self.source.connect().map_err(|e| self.upstream_error(e))
    }

    /// Disconnect the upstream source
    pub fn disconnect_source(&mut self) -> CacheResult<()> {
        info!(source = self.source.name(), "Disconnecting telemetry source");
        self.source.disconnect().map_err(|e| self.upstream_error(e))
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    pub const fn store(&self) -> &SampleStore {
        &self.store
    }

    pub const fn coverage(&self) -> &CoverageIndex {
        &self.coverage
    }

    pub const fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Give back the upstream source
    pub fn into_source(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockLog, MockSource, day, interval};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_cache(dir: &TempDir) -> (RangeCache<MockSource>, Arc<Mutex<MockLog>>) {
        let (source, log) = MockSource::new();
        let store = SampleStore::open(dir.path().join("cache.redb")).unwrap();
        (RangeCache::new(source, store).unwrap(), log)
    }

    #[test]
    fn test_first_query_fetches_whole_range() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        let samples = cache.get_samples_in_range(&interval(2, 4)).unwrap();
        assert_eq!(samples, MockSource::expected(day(2), day(4)));
        assert_eq!(log.lock().calls, vec![interval(2, 4)]);
        assert_eq!(cache.stats().upstream_fetches(), 1);
        assert_eq!(cache.stats().samples_fetched(), samples.len() as u64);
    }

    #[test]
    fn test_repeated_query_makes_no_upstream_call() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        let first = cache.get_samples_in_range(&interval(2, 5)).unwrap();
        let second = cache.get_samples_in_range(&interval(2, 5)).unwrap();
        assert_eq!(first, second);
        assert_eq!(log.lock().calls.len(), 1);
    }

    #[test]
    fn test_inner_query_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        cache.get_samples_in_range(&interval(1, 8)).unwrap();
        let inner = cache.get_samples_in_range(&interval(3, 5)).unwrap();
        assert_eq!(inner, MockSource::expected(day(3), day(5)));
        assert_eq!(log.lock().calls, vec![interval(1, 8)]);
    }

    #[test]
    fn test_extending_both_sides_fetches_each_gap() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        cache.get_samples_in_range(&interval(2, 3)).unwrap();
        let samples = cache.get_samples_in_range(&interval(1, 8)).unwrap();

        assert_eq!(
            log.lock().calls,
            vec![interval(2, 3), interval(1, 2), interval(3, 8)]
        );
        // result includes the samples cached by the first query
        assert_eq!(samples, MockSource::expected(day(1), day(8)));
        assert_eq!(cache.coverage().all_covered(), vec![interval(1, 8)]);
    }

    #[test]
    fn test_extending_one_side_fetches_only_the_new_part() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        cache.get_samples_in_range(&interval(1, 3)).unwrap();
        cache.get_samples_in_range(&interval(1, 4)).unwrap();
        cache.get_samples_in_range(&interval(1, 5)).unwrap();

        assert_eq!(
            log.lock().calls,
            vec![interval(1, 3), interval(3, 4), interval(4, 5)]
        );
    }

    #[test]
    fn test_failed_gap_keeps_earlier_progress() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        cache.get_samples_in_range(&interval(3, 4)).unwrap();
        cache.get_samples_in_range(&interval(6, 7)).unwrap();
        log.lock().fail_from = Some(day(4));

        // gaps are [1,3), [4,6), [7,9); the second one fails
        let err = cache.get_samples_in_range(&interval(1, 9)).unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(
            cache.coverage().all_covered(),
            vec![interval(1, 4), interval(6, 7)]
        );
        assert_eq!(cache.stats().fetch_failures(), 1);

        // earlier progress is durable
        assert_eq!(
            cache.store().read_coverage().unwrap(),
            vec![interval(1, 4), interval(6, 7)]
        );

        log.lock().fail_from = None;
        log.lock().calls.clear();
        let samples = cache.get_samples_in_range(&interval(1, 9)).unwrap();
        assert_eq!(log.lock().calls, vec![interval(4, 6), interval(7, 9)]);
        assert_eq!(samples, MockSource::expected(day(1), day(9)));
    }

    #[test]
    fn test_coverage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let (mut cache, _) = open_cache(&dir);
            cache.get_samples_in_range(&interval(2, 6)).unwrap();
        }

        let (mut cache, log) = open_cache(&dir);
        assert_eq!(cache.coverage().all_covered(), vec![interval(2, 6)]);
        let samples = cache.get_samples_in_range(&interval(3, 5)).unwrap();
        assert_eq!(samples, MockSource::expected(day(3), day(5)));
        assert!(log.lock().calls.is_empty());
    }

    #[test]
    fn test_duplicate_from_upstream_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        cache.get_samples_in_range(&interval(1, 3)).unwrap();
        log.lock().ignore_range_from = Some(day(3));

        let err = cache.get_samples_in_range(&interval(3, 4)).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(cache.coverage().all_covered(), vec![interval(1, 3)]);

        // the cache is still usable
        log.lock().ignore_range_from = None;
        let samples = cache.get_samples_in_range(&interval(1, 3)).unwrap();
        assert_eq!(samples, MockSource::expected(day(1), day(3)));
    }

    #[test]
    fn test_failed_write_on_later_gap_keeps_earlier_coverage() {
        let dir = TempDir::new().unwrap();
        {
            let (mut cache, log) = open_cache(&dir);
            cache.get_samples_in_range(&interval(3, 4)).unwrap();
            log.lock().ignore_range_from = Some(day(4));

            // gaps are [1,3) and [4,6); the second returns rows already stored
            let err = cache.get_samples_in_range(&interval(1, 6)).unwrap_err();
            assert!(err.is_duplicate());
            assert_eq!(cache.coverage().all_covered(), vec![interval(1, 4)]);
        }

        let (mut cache, log) = open_cache(&dir);
        assert_eq!(cache.coverage().all_covered(), vec![interval(1, 4)]);
        assert_eq!(
            cache.store().count().unwrap(),
            MockSource::expected(day(1), day(4)).len() as u64
        );

        let samples = cache.get_samples_in_range(&interval(1, 6)).unwrap();
        assert_eq!(log.lock().calls, vec![interval(4, 6)]);
        assert_eq!(samples, MockSource::expected(day(1), day(6)));
    }

    #[test]
    fn test_connect_and_disconnect_reach_source() {
        let dir = TempDir::new().unwrap();
        let (mut cache, log) = open_cache(&dir);

        cache.connect_source().unwrap();
        cache.disconnect_source().unwrap();
        assert_eq!(log.lock().connects, 1);
        assert_eq!(log.lock().disconnects, 1);
    }
}
