//! Coverage index for fetched time ranges
//!
//! Tracks which time ranges have already been fetched from the upstream
//! telemetry source, as a minimal set of disjoint, non-touching intervals
//! kept sorted by start. From that set it computes, for any query, the
//! sub-ranges that still need fetching.
//!
//! ```text
//! covered:    [----)   [----)   [----)
//! query:         [-------------)
//! uncovered:        [--)    [--)
//! ```

use parking_lot::Mutex;
use tlmcache_common::TimeInterval;

/// Minimal disjoint interval set.
///
/// Every operation runs under one coarse lock.
#[derive(Debug, Default)]
pub struct CoverageIndex {
    covered: Mutex<Vec<TimeInterval>>,
}

impl CoverageIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index covering the given intervals
    #[must_use]
    pub fn from_intervals(intervals: &[TimeInterval]) -> Self {
        let index = Self::new();
        index.add_all(intervals);
        index
    }

    /// Merge an interval into the set, coalescing it with every interval it
    /// overlaps or touches
    pub fn add(&self, interval: TimeInterval) {
        let mut covered = self.covered.lock();
        Self::insert_merged(&mut covered, interval);
    }

    /// Merge several intervals
    pub fn add_all(&self, intervals: &[TimeInterval]) {
        let mut covered = self.covered.lock();
        for interval in intervals {
            Self::insert_merged(&mut covered, *interval);
        }
    }

    fn insert_merged(covered: &mut Vec<TimeInterval>, interval: TimeInterval) {
        // first interval that could merge with the new one; everything
        // before it ends strictly before the new interval starts
        let first = covered.partition_point(|c| c.stop() < interval.start());

        let mut merged = interval;
        let mut last = first;
        while last < covered.len() && covered[last].overlaps_or_touches(&interval) {
            merged = merged.span(&covered[last]);
            last += 1;
        }

        covered.splice(first..last, std::iter::once(merged));
    }

    /// Sub-intervals of `query` that are not covered, sorted by start.
    ///
    /// Empty when the query is fully covered.
    #[must_use]
    pub fn uncovered_within(&self, query: &TimeInterval) -> Vec<TimeInterval> {
        let covered = self.covered.lock();
        let mut gaps = Vec::new();
        let mut cursor = query.start();

        let first = covered.partition_point(|c| c.stop() <= query.start());
        for c in &covered[first..] {
            if c.start() >= query.stop() {
                break;
            }
            if c.start() > cursor {
                // start < stop holds here, so construction cannot fail
                if let Ok(gap) = TimeInterval::new(cursor, c.start()) {
                    gaps.push(gap);
                }
            }
            cursor = cursor.max(c.stop());
        }

        if cursor < query.stop()
            && let Ok(gap) = TimeInterval::new(cursor, query.stop())
        {
            gaps.push(gap);
        }
        gaps
    }

    /// The current covered set, sorted by start
    #[must_use]
    pub fn all_covered(&self) -> Vec<TimeInterval> {
        self.covered.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.covered.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.covered.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rand::Rng;
    use tlmcache_common::time::parse_utc;

    fn day(doy: u32) -> DateTime<Utc> {
        parse_utc(&format!("2025-{doy:03}T00:00:00")).unwrap()
    }

    fn range_of(start_doy: u32, stop_doy: u32) -> TimeInterval {
        TimeInterval::new(day(start_doy), day(stop_doy)).unwrap()
    }

    #[test]
    fn test_uncovered_between_partial_coverage() {
        let index = CoverageIndex::new();
        index.add_all(&[range_of(1, 3), range_of(4, 6), range_of(7, 9)]);
        assert_eq!(
            index.uncovered_within(&range_of(2, 8)),
            vec![range_of(3, 4), range_of(6, 7)]
        );
    }

    #[test]
    fn test_uncovered_on_both_sides() {
        let index = CoverageIndex::from_intervals(&[range_of(4, 6)]);
        assert_eq!(
            index.uncovered_within(&range_of(2, 8)),
            vec![range_of(2, 4), range_of(6, 8)]
        );
    }

    #[test]
    fn test_appending_pattern_from_empty() {
        let index = CoverageIndex::new();
        assert_eq!(index.uncovered_within(&range_of(1, 3)), vec![range_of(1, 3)]);

        index.add(range_of(1, 3));
        assert_eq!(index.uncovered_within(&range_of(1, 4)), vec![range_of(3, 4)]);

        index.add(range_of(3, 4));
        assert_eq!(index.uncovered_within(&range_of(1, 5)), vec![range_of(4, 5)]);
        assert_eq!(index.all_covered(), vec![range_of(1, 4)]);
    }

    #[test]
    fn test_query_outside_coverage() {
        let index =
            CoverageIndex::from_intervals(&[range_of(1, 3), range_of(4, 6), range_of(7, 9)]);
        assert_eq!(index.uncovered_within(&range_of(15, 16)), vec![range_of(15, 16)]);
    }

    #[test]
    fn test_fully_covered_query() {
        let index = CoverageIndex::from_intervals(&[range_of(1, 10)]);
        assert!(index.uncovered_within(&range_of(2, 8)).is_empty());
        assert!(index.uncovered_within(&range_of(1, 10)).is_empty());
    }

    #[test]
    fn test_add_coalesces_overlapping_and_adjacent() {
        let index = CoverageIndex::new();
        index.add(range_of(5, 7));
        index.add(range_of(1, 2));
        index.add(range_of(10, 12));
        assert_eq!(index.len(), 3);

        // bridges all three
        index.add(range_of(2, 11));
        assert_eq!(index.all_covered(), vec![range_of(1, 12)]);
    }

    #[test]
    fn test_add_contained_interval_is_noop() {
        let index = CoverageIndex::from_intervals(&[range_of(1, 10)]);
        index.add(range_of(3, 4));
        assert_eq!(index.all_covered(), vec![range_of(1, 10)]);
    }

    fn random_interval(rng: &mut impl Rng) -> TimeInterval {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let start = rng.gen_range(0..200);
        let len = rng.gen_range(1..20);
        TimeInterval::new(
            base + Duration::minutes(start),
            base + Duration::minutes(start + len),
        )
        .unwrap()
    }

    #[test]
    fn test_random_adds_keep_set_minimal() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let index = CoverageIndex::new();
            for _ in 0..rng.gen_range(1..30) {
                index.add(random_interval(&mut rng));
                let covered = index.all_covered();
                for pair in covered.windows(2) {
                    // sorted, disjoint and not touching
                    assert!(pair[0].stop() < pair[1].start(), "{covered:?}");
                }
            }
        }
    }

    #[test]
    fn test_random_uncovered_partitions_query() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let index = CoverageIndex::new();
            for _ in 0..rng.gen_range(0..15) {
                index.add(random_interval(&mut rng));
            }
            let covered = index.all_covered();
            let query = random_interval(&mut rng);
            let gaps = index.uncovered_within(&query);

            for gap in &gaps {
                assert!(query.start() <= gap.start() && gap.stop() <= query.stop());
                for c in &covered {
                    assert!(gap.stop() <= c.start() || c.stop() <= gap.start());
                }
            }
            for pair in gaps.windows(2) {
                assert!(pair[0].stop() <= pair[1].start());
            }

            // gaps plus covered pieces add up to the whole query
            let covered_in_query: i64 = covered
                .iter()
                .map(|c| {
                    let lo = c.start().max(query.start());
                    let hi = c.stop().min(query.stop());
                    (hi - lo).num_seconds().max(0)
                })
                .sum();
            let gap_total: i64 = gaps.iter().map(|g| (g.stop() - g.start()).num_seconds()).sum();
            assert_eq!(
                covered_in_query + gap_total,
                (query.stop() - query.start()).num_seconds()
            );

            // after filling the gaps nothing is left
            index.add_all(&gaps);
            assert!(index.uncovered_within(&query).is_empty());
        }
    }
}
