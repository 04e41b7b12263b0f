//! Aggregation of work chunks into summaries and period pivots.
//!
//! Durations are accumulated as integer nanoseconds, so partial sums computed
//! on different threads merge exactly and results do not depend on how rayon
//! splits the input. Hours are only rounded by [`round_hours`], which callers
//! apply once when presenting results.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::segment::{WorkChunk, nanoseconds};
use crate::types::OwnerId;

const NS_PER_HOUR: f64 = 3_600_000_000_000.0;

/// Rounds an hour figure to two decimals for display.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Running totals for a group of chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    duration_ns: i128,
    events: u64,
    chunks: u64,
}

impl Tally {
    fn add(&mut self, chunk: &WorkChunk) {
        self.duration_ns += nanoseconds(chunk.end - chunk.start);
        self.events += chunk.event_count;
        self.chunks += 1;
    }

    const fn merge(self, other: Self) -> Self {
        Self {
            duration_ns: self.duration_ns + other.duration_ns,
            events: self.events + other.events,
            chunks: self.chunks + other.chunks,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn hours(self) -> f64 {
        self.duration_ns as f64 / NS_PER_HOUR
    }
}

/// Parallel map-reduce of chunks into per-key tallies.
fn tally_by<K, F>(chunks: &[WorkChunk], key_fn: F) -> HashMap<K, Tally>
where
    K: Eq + Hash + Send,
    F: Fn(&WorkChunk) -> K + Sync,
{
    chunks
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<K, Tally>, chunk| {
            acc.entry(key_fn(chunk)).or_default().add(chunk);
            acc
        })
        .reduce(HashMap::new, |mut left, right| {
            for (key, tally) in right {
                let entry = left.entry(key).or_default();
                *entry = entry.merge(tally);
            }
            left
        })
}

/// Totals for one developer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperSummary {
    pub owner: OwnerId,
    pub total_hours: f64,
    pub total_events: u64,
    pub chunk_count: u64,
}

/// Builds one summary row per owner.
///
/// Rows are ordered by descending hours, ties broken by owner.
pub fn summarize(chunks: &[WorkChunk]) -> Vec<DeveloperSummary> {
    let mut summaries: Vec<DeveloperSummary> = tally_by(chunks, |chunk| chunk.owner.clone())
        .into_iter()
        .map(|(owner, tally)| DeveloperSummary {
            owner,
            total_hours: tally.hours(),
            total_events: tally.events,
            chunk_count: tally.chunks,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_hours
            .total_cmp(&a.total_hours)
            .then_with(|| a.owner.cmp(&b.owner))
    });
    summaries
}

/// Overall figures for a chunk set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub developer_count: usize,
    pub chunk_count: usize,
    pub event_count: u64,
    pub total_hours: f64,
}

pub fn totals(chunks: &[WorkChunk]) -> Totals {
    let owners: BTreeSet<&OwnerId> = chunks.iter().map(|chunk| &chunk.owner).collect();
    let tally = chunks.iter().fold(Tally::default(), |mut tally, chunk| {
        tally.add(chunk);
        tally
    });

    Totals {
        developer_count: owners.len(),
        chunk_count: chunks.len(),
        event_count: tally.events,
        total_hours: tally.hours(),
    }
}

/// Standard calendar buckets for pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    /// Monday-based weeks.
    Week,
    Month,
}

impl Period {
    /// First calendar date of the bucket containing `timestamp`.
    pub fn bucket(self, timestamp: DateTime<Utc>) -> NaiveDate {
        let date = timestamp.date_naive();
        match self {
            Self::Day => date,
            Self::Week => {
                date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Self::Month => date.with_day(1).unwrap_or(date),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hours per (period, owner), with row and column totals.
///
/// Cells hold unrounded hours. Totals are summed from the cells on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodPivot<K: Ord> {
    cells: BTreeMap<K, BTreeMap<OwnerId, f64>>,
}

impl<K: Ord> PeriodPivot<K> {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Periods in ascending order.
    pub fn periods(&self) -> impl Iterator<Item = &K> {
        self.cells.keys()
    }

    /// Every owner appearing in any period, ascending.
    pub fn owners(&self) -> Vec<&OwnerId> {
        let owners: BTreeSet<&OwnerId> = self.cells.values().flat_map(BTreeMap::keys).collect();
        owners.into_iter().collect()
    }

    /// Hours for one cell; `0.0` when the owner had no chunk in that period.
    pub fn hours(&self, period: &K, owner: &OwnerId) -> f64 {
        self.cells
            .get(period)
            .and_then(|row| row.get(owner))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum across owners for one period.
    pub fn period_total(&self, period: &K) -> f64 {
        self.cells
            .get(period)
            .map_or(0.0, |row| row.values().sum())
    }

    /// Sum across periods for each owner.
    pub fn owner_totals(&self) -> BTreeMap<&OwnerId, f64> {
        let mut totals: BTreeMap<&OwnerId, f64> = BTreeMap::new();
        for row in self.cells.values() {
            for (owner, hours) in row {
                *totals.entry(owner).or_insert(0.0) += hours;
            }
        }
        totals
    }

    /// Sum of every cell.
    pub fn grand_total(&self) -> f64 {
        self.cells.values().flat_map(BTreeMap::values).sum()
    }
}

/// Groups chunks by `(period_fn(chunk.start), owner)` and sums their hours.
pub fn pivot<K, F>(chunks: &[WorkChunk], period_fn: F) -> PeriodPivot<K>
where
    K: Ord + Hash + Send,
    F: Fn(DateTime<Utc>) -> K + Sync,
{
    let mut cells: BTreeMap<K, BTreeMap<OwnerId, f64>> = BTreeMap::new();
    for ((period, owner), tally) in tally_by(chunks, |chunk| {
        (period_fn(chunk.start), chunk.owner.clone())
    }) {
        cells.entry(period).or_default().insert(owner, tally.hours());
    }
    PeriodPivot { cells }
}

/// One (period, owner) row of a long-form breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBreakdown<K> {
    pub period: K,
    pub owner: OwnerId,
    pub hours: f64,
    pub event_count: u64,
    pub chunk_count: u64,
}

/// Like [`pivot`], but keeps event and chunk counts, ordered by period then owner.
pub fn breakdown<K, F>(chunks: &[WorkChunk], period_fn: F) -> Vec<PeriodBreakdown<K>>
where
    K: Ord + Hash + Send,
    F: Fn(DateTime<Utc>) -> K + Sync,
{
    let mut rows: Vec<PeriodBreakdown<K>> = tally_by(chunks, |chunk| {
        (period_fn(chunk.start), chunk.owner.clone())
    })
    .into_iter()
    .map(|((period, owner), tally)| PeriodBreakdown {
        period,
        owner,
        hours: tally.hours(),
        event_count: tally.events,
        chunk_count: tally.chunks,
    })
    .collect();

    rows.sort_by(|a, b| a.period.cmp(&b.period).then_with(|| a.owner.cmp(&b.owner)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InactivityThreshold;
    use crate::event::Event;
    use crate::segment::segment;
    use chrono::{Duration, TimeZone};

    const EPS: f64 = 1e-9;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).unwrap()
    }

    #[allow(clippy::cast_precision_loss)]
    fn chunk(name: &str, start: DateTime<Utc>, minutes: i64, events: u64) -> WorkChunk {
        WorkChunk {
            owner: owner(name),
            start,
            end: start + Duration::minutes(minutes),
            duration_seconds: (minutes * 60) as f64,
            event_count: events,
            gap_to_next_seconds: None,
        }
    }

    fn sample() -> Vec<WorkChunk> {
        // Jan 13 2025 is a Monday.
        vec![
            chunk("alice", at(13, 9, 0), 90, 10),
            chunk("alice", at(13, 14, 0), 30, 4),
            chunk("alice", at(20, 9, 0), 60, 6),
            chunk("bob", at(13, 10, 0), 45, 3),
            chunk("bob", at(14, 10, 0), 75, 5),
            chunk("carol", at(19, 23, 30), 60, 2),
        ]
    }

    #[test]
    fn summarize_sums_per_owner() {
        let summaries = summarize(&sample());

        assert_eq!(summaries.len(), 3);
        let alice = &summaries[0];
        assert_eq!(alice.owner.as_str(), "alice");
        assert!((alice.total_hours - 3.0).abs() < EPS);
        assert_eq!(alice.total_events, 20);
        assert_eq!(alice.chunk_count, 3);
    }

    #[test]
    fn summarize_orders_by_hours_then_owner() {
        let chunks = vec![
            chunk("dave", at(13, 9, 0), 30, 1),
            chunk("bob", at(13, 9, 0), 60, 1),
            chunk("amy", at(13, 9, 0), 30, 1),
        ];

        let order: Vec<_> = summarize(&chunks)
            .into_iter()
            .map(|s| s.owner.to_string())
            .collect();

        assert_eq!(order, vec!["bob", "amy", "dave"]);
    }

    #[test]
    fn summarize_keeps_sub_millisecond_durations() {
        let start = at(15, 9, 0);
        let short = WorkChunk {
            owner: owner("a"),
            start,
            end: start + Duration::microseconds(400),
            duration_seconds: 0.0004,
            event_count: 2,
            gap_to_next_seconds: None,
        };

        let summaries = summarize(&[short.clone(), short]);

        assert!((summaries[0].total_hours * 3600.0 - 0.0008).abs() < 1e-12);
    }

    #[test]
    fn summarize_of_nothing_is_empty() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn summary_hours_match_chunk_durations() {
        let threshold = InactivityThreshold::from_minutes(20).unwrap();
        let events: Vec<_> = (0..200)
            .map(|i: i64| {
                let name = ["x", "y", "z"][usize::try_from(i % 3).unwrap()];
                Event::new(owner(name), at(13, 8, 0) + Duration::seconds(i * i * 7))
            })
            .collect();
        let chunks = segment(&events, threshold);

        let from_summaries: f64 = summarize(&chunks).iter().map(|s| s.total_hours).sum();
        let from_chunks: f64 = chunks.iter().map(|c| c.duration_seconds / 3600.0).sum();

        assert!((from_summaries - from_chunks).abs() < 1e-6);
    }

    #[test]
    fn daily_pivot_buckets_by_start_date() {
        let pivot = pivot(&sample(), |ts| Period::Day.bucket(ts));

        let jan13 = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        let jan14 = NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
        assert_eq!(pivot.periods().count(), 4);
        assert!((pivot.hours(&jan13, &owner("alice")) - 2.0).abs() < EPS);
        assert!((pivot.hours(&jan13, &owner("bob")) - 0.75).abs() < EPS);
        assert!((pivot.hours(&jan14, &owner("bob")) - 1.25).abs() < EPS);
        assert!(pivot.hours(&jan14, &owner("alice")).abs() < EPS);
        assert!((pivot.period_total(&jan13) - 2.75).abs() < EPS);
    }

    #[test]
    fn chunk_crossing_midnight_stays_in_start_bucket() {
        let pivot = pivot(&sample(), |ts| Period::Day.bucket(ts));
        let jan19 = NaiveDate::from_ymd_opt(2025, 1, 19).unwrap();
        let jan20 = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();

        assert!((pivot.hours(&jan19, &owner("carol")) - 1.0).abs() < EPS);
        assert!(pivot.hours(&jan20, &owner("carol")).abs() < EPS);
    }

    #[test]
    fn weekly_pivot_starts_on_monday() {
        let pivot = pivot(&sample(), |ts| Period::Week.bucket(ts));

        let periods: Vec<_> = pivot.periods().copied().collect();
        assert_eq!(
            periods,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            ]
        );
        let week1 = periods[0];
        assert!((pivot.hours(&week1, &owner("alice")) - 2.0).abs() < EPS);
        assert!((pivot.hours(&week1, &owner("bob")) - 2.0).abs() < EPS);
        // Sunday Jan 19 belongs to the week of Monday Jan 13.
        assert!((pivot.hours(&week1, &owner("carol")) - 1.0).abs() < EPS);
    }

    #[test]
    fn pivot_totals_match_independent_sums() {
        let chunks = sample();
        let pivot = pivot(&chunks, |ts| Period::Day.bucket(ts));

        let column_sum: f64 = pivot.periods().map(|p| pivot.period_total(p)).sum();
        let row_sum: f64 = pivot.owner_totals().values().sum();
        let chunk_sum: f64 = chunks.iter().map(WorkChunk::hours).sum();

        assert!((pivot.grand_total() - chunk_sum).abs() < EPS);
        assert!((column_sum - chunk_sum).abs() < EPS);
        assert!((row_sum - chunk_sum).abs() < EPS);

        for summary in summarize(&chunks) {
            let owner_total = pivot.owner_totals()[&summary.owner];
            assert!((owner_total - summary.total_hours).abs() < EPS);
        }
    }

    #[test]
    fn pivot_owners_are_sorted_union() {
        let pivot = pivot(&sample(), |ts| Period::Day.bucket(ts));
        let owners: Vec<_> = pivot.owners().into_iter().map(OwnerId::as_str).collect();
        assert_eq!(owners, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn pivot_accepts_custom_period_keys() {
        let by_hour = pivot(&sample(), |ts| ts.format("%H").to_string());
        assert!((by_hour.period_total(&"09".to_string()) - 2.5).abs() < EPS);
        assert!(by_hour.period_total(&"03".to_string()).abs() < EPS);
    }

    #[test]
    fn empty_pivot_has_zero_totals() {
        let pivot = pivot(&[], |ts| Period::Day.bucket(ts));
        assert!(pivot.is_empty());
        assert!(pivot.grand_total().abs() < EPS);
        assert!(pivot.owner_totals().is_empty());
    }

    #[test]
    fn breakdown_keeps_counts_in_period_owner_order() {
        let rows = breakdown(&sample(), |ts| Period::Day.bucket(ts));

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.period.format("%m-%d").to_string(), r.owner.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("01-13".to_string(), "alice"),
                ("01-13".to_string(), "bob"),
                ("01-14".to_string(), "bob"),
                ("01-19".to_string(), "carol"),
                ("01-20".to_string(), "alice"),
            ]
        );
        assert_eq!(rows[0].event_count, 14);
        assert_eq!(rows[0].chunk_count, 2);
        assert!((rows[0].hours - 2.0).abs() < EPS);
    }

    #[test]
    fn totals_cover_whole_set() {
        let totals = totals(&sample());
        assert_eq!(totals.developer_count, 3);
        assert_eq!(totals.chunk_count, 6);
        assert_eq!(totals.event_count, 30);
        assert!((totals.total_hours - 6.0).abs() < EPS);
    }

    #[test]
    fn month_bucket_is_first_of_month() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 17, 12, 0, 0).unwrap();
        assert_eq!(
            Period::Month.bucket(ts),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded values are compared exactly")]
    fn round_hours_uses_two_decimals() {
        assert_eq!(round_hours(1.234_56), 1.23);
        assert_eq!(round_hours(1.235_01), 1.24);
        assert_eq!(round_hours(0.0), 0.0);
    }

    #[test]
    fn rounding_once_avoids_compounded_error() {
        // Three 20-minute chunks on separate days: each cell rounds to 0.33,
        // but the owner's total is exactly one hour.
        let chunks = vec![
            chunk("a", at(13, 9, 0), 20, 1),
            chunk("a", at(14, 9, 0), 20, 1),
            chunk("a", at(15, 9, 0), 20, 1),
        ];
        let pivot = pivot(&chunks, |ts| Period::Day.bucket(ts));

        let total = pivot.owner_totals()[&owner("a")];
        assert!((round_hours(total) - 1.0).abs() < EPS);

        let compounded: f64 = pivot
            .periods()
            .map(|p| round_hours(pivot.hours(p, &owner("a"))))
            .sum();
        assert!((compounded - 0.99).abs() < EPS);
    }
}
