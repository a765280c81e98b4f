//! Per-day slicing of email sources.
//!
//! Both modes consume their inputs front to back through a cursor and never
//! look back, so the output is fully determined by the input order. Running
//! out of records is not an error here: a day simply gets fewer records, and
//! later days get none from the exhausted source.

use serde::{Deserialize, Serialize};

use crate::allocation::quota::{DailyBatch, QuotaPlan};
use crate::error::AppError;
use crate::ingest::EmailSource;
use crate::selection::SplitRatio;

/// Forward-only reader over a record slice.
#[derive(Debug)]
struct SliceCursor<'a> {
    records: &'a [String],
    position: usize,
}

impl<'a> SliceCursor<'a> {
    fn new(records: &'a [String]) -> Self {
        Self {
            records,
            position: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.records.len() - self.position
    }

    /// Takes up to `wanted` records. Advances only by what was available.
    fn take(&mut self, wanted: u64) -> &'a [String] {
        let n = usize::try_from(wanted)
            .unwrap_or(usize::MAX)
            .min(self.remaining());
        let start = self.position;
        self.position += n;
        &self.records[start..self.position]
    }
}

/// Splits one pool into consecutive day-sized slices.
///
/// Day `i` starts where day `i - 1` stopped.
pub fn allocate_pool(plan: &QuotaPlan, pool: &EmailSource) -> Vec<DailyBatch> {
    let mut cursor = SliceCursor::new(pool.records());

    plan.days()
        .iter()
        .enumerate()
        .map(|(i, &requested)| DailyBatch {
            day: i + 1,
            requested,
            records: cursor.take(requested).to_vec(),
        })
        .collect()
}

/// Primary share of a day: `floor(requested * primary% / 100)`, capped at
/// the day's total.
pub fn primary_share(requested: u64, ratio: SplitRatio) -> u64 {
    if ratio.primary.is_nan() || ratio.primary <= 0.0 {
        return 0;
    }
    let share = (requested as f64 * ratio.primary / 100.0).floor();
    // `as` saturates for values beyond u64::MAX.
    (share as u64).min(requested)
}

/// Fills each day from two sources by ratio, primary records first.
///
/// The secondary share is whatever the primary share leaves of the day's
/// quota; `ratio.secondary` itself is not consulted. Each source has its own
/// cursor, so a short primary does not pull extra records from the
/// secondary.
pub fn allocate_ratio(
    plan: &QuotaPlan,
    primary: &EmailSource,
    secondary: Option<&EmailSource>,
    ratio: SplitRatio,
) -> Vec<DailyBatch> {
    let mut first = SliceCursor::new(primary.records());
    let mut second = SliceCursor::new(secondary.map(EmailSource::records).unwrap_or(&[]));

    plan.days()
        .iter()
        .enumerate()
        .map(|(i, &requested)| {
            let from_primary = primary_share(requested, ratio);
            let from_secondary = requested - from_primary;

            let mut records = first.take(from_primary).to_vec();
            records.extend_from_slice(second.take(from_secondary));

            DailyBatch {
                day: i + 1,
                requested,
                records,
            }
        })
        .collect()
}

/// Fails on the first day that got fewer records than requested.
pub fn ensure_complete(batches: &[DailyBatch]) -> Result<(), AppError> {
    match batches.iter().find(|b| b.is_short()) {
        Some(batch) => Err(AppError::InsufficientRecords {
            day: batch.day,
            requested: batch.requested,
            delivered: batch.delivered(),
        }),
        None => Ok(()),
    }
}

/// Requested versus delivered totals for a finished allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub days: usize,
    pub requested: u64,
    pub delivered: u64,
    /// 1-based day numbers that got fewer records than requested.
    pub short_days: Vec<usize>,
}

impl AllocationSummary {
    pub fn from_batches(batches: &[DailyBatch]) -> Self {
        Self {
            days: batches.len(),
            requested: batches
                .iter()
                .fold(0u64, |acc, b| acc.saturating_add(b.requested)),
            delivered: batches.iter().map(DailyBatch::delivered).sum(),
            short_days: batches
                .iter()
                .filter(|b| b.is_short())
                .map(|b| b.day)
                .collect(),
        }
    }

    pub fn shortfall(&self) -> u64 {
        self.requested.saturating_sub(self.delivered)
    }

    pub fn first_short_day(&self) -> Option<usize> {
        self.short_days.first().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.short_days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: &str, n: usize) -> EmailSource {
        (0..n).map(|i| format!("{}{}@example.com", tag, i)).collect()
    }

    fn lens(batches: &[DailyBatch]) -> Vec<usize> {
        batches.iter().map(|b| b.records.len()).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pool mode
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn pool_slices_are_contiguous() {
        let pool = tagged("u", 6);
        let batches = allocate_pool(&QuotaPlan::new(vec![2, 3, 1]), &pool);

        assert_eq!(lens(&batches), vec![2, 3, 1]);
        let joined: Vec<String> = batches.iter().flat_map(|b| b.records.clone()).collect();
        assert_eq!(joined, pool.records());
        assert_eq!(
            batches.iter().map(|b| b.day).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn pool_total_matches_plan_when_enough_records() {
        let pool = tagged("u", 100);
        let plan = QuotaPlan::new(vec![10, 0, 25, 7, 30]);
        let batches = allocate_pool(&plan, &pool);

        let total: usize = lens(&batches).iter().sum();
        assert_eq!(total as u64, plan.total());
        assert!(AllocationSummary::from_batches(&batches).is_complete());
    }

    #[test]
    fn pool_exhaustion_truncates_silently() {
        let pool = tagged("u", 5);
        let batches = allocate_pool(&QuotaPlan::new(vec![3, 3, 4, 2]), &pool);

        assert_eq!(lens(&batches), vec![3, 2, 0, 0]);
        assert!(batches[1].is_short());
        assert!(batches[2].records.is_empty());
        assert!(batches[3].records.is_empty());

        let summary = AllocationSummary::from_batches(&batches);
        assert_eq!(summary.delivered, 5);
        assert_eq!(summary.requested, 12);
        assert_eq!(summary.shortfall(), 7);
        assert_eq!(summary.short_days, vec![2, 3, 4]);
        assert_eq!(summary.first_short_day(), Some(2));
    }

    #[test]
    fn zero_quota_day_gets_nothing_and_is_not_short() {
        let pool = tagged("u", 2);
        let batches = allocate_pool(&QuotaPlan::new(vec![0, 2]), &pool);

        assert_eq!(lens(&batches), vec![0, 2]);
        assert!(!batches[0].is_short());
    }

    #[test]
    fn empty_plan_gives_no_batches() {
        assert!(allocate_pool(&QuotaPlan::default(), &tagged("u", 3)).is_empty());
    }

    #[test]
    fn pool_is_deterministic() {
        let pool = tagged("u", 9);
        let plan = QuotaPlan::new(vec![4, 4, 4]);
        assert_eq!(allocate_pool(&plan, &pool), allocate_pool(&plan, &pool));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ratio mode
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn primary_share_rounds_down_and_caps() {
        assert_eq!(primary_share(10, SplitRatio::new(70.0, 30.0)), 7);
        assert_eq!(primary_share(3, SplitRatio::new(50.0, 50.0)), 1);
        assert_eq!(primary_share(10, SplitRatio::new(0.0, 100.0)), 0);
        assert_eq!(primary_share(10, SplitRatio::new(150.0, 0.0)), 10);
        assert_eq!(primary_share(10, SplitRatio::new(f64::NAN, 0.0)), 0);
    }

    #[test]
    fn ratio_split_interleaves_sources_per_day() {
        let primary = tagged("p", 10);
        let secondary = tagged("s", 10);
        let batches = allocate_ratio(
            &QuotaPlan::new(vec![4, 4]),
            &primary,
            Some(&secondary),
            SplitRatio::new(50.0, 50.0),
        );

        assert_eq!(
            batches[0].records,
            vec!["p0@example.com", "p1@example.com", "s0@example.com", "s1@example.com"]
        );
        assert_eq!(
            batches[1].records,
            vec!["p2@example.com", "p3@example.com", "s2@example.com", "s3@example.com"]
        );
    }

    #[test]
    fn ratio_split_cursor_never_goes_negative() {
        // Plan [10, 10] at 70/30 with 5 primary and 20 secondary records.
        let primary = tagged("p", 5);
        let secondary = tagged("s", 20);
        let batches = allocate_ratio(
            &QuotaPlan::new(vec![10, 10]),
            &primary,
            Some(&secondary),
            SplitRatio::new(70.0, 30.0),
        );

        let day1 = &batches[0].records;
        assert_eq!(day1.len(), 8);
        assert_eq!(day1.iter().filter(|r| r.starts_with('p')).count(), 5);
        assert_eq!(day1.iter().filter(|r| r.starts_with('s')).count(), 3);
        assert!(day1[..5].iter().all(|r| r.starts_with('p')));

        // Primary is exhausted; the secondary still only supplies its 3.
        let day2 = &batches[1].records;
        assert_eq!(day2.iter().filter(|r| r.starts_with('p')).count(), 0);
        assert_eq!(
            day2,
            &vec!["s3@example.com", "s4@example.com", "s5@example.com"]
        );
        assert!(day2.len() <= 10);
    }

    #[test]
    fn ratio_split_ignores_secondary_percentage() {
        let primary = tagged("p", 10);
        let secondary = tagged("s", 10);
        let batches = allocate_ratio(
            &QuotaPlan::new(vec![10]),
            &primary,
            Some(&secondary),
            SplitRatio::new(40.0, 10.0),
        );

        assert_eq!(batches[0].records.len(), 10);
        assert_eq!(
            batches[0]
                .records
                .iter()
                .filter(|r| r.starts_with('s'))
                .count(),
            6
        );
    }

    #[test]
    fn ratio_split_without_secondary() {
        let primary = tagged("p", 10);
        let batches = allocate_ratio(
            &QuotaPlan::new(vec![4]),
            &primary,
            None,
            SplitRatio::new(50.0, 50.0),
        );

        assert_eq!(batches[0].records.len(), 2);
        assert!(batches[0].is_short());
    }

    #[test]
    fn ratio_split_is_reproducible() {
        let primary = tagged("p", 13);
        let secondary = tagged("s", 7);
        let plan = QuotaPlan::new(vec![5, 5, 5, 5]);
        let ratio = SplitRatio::new(60.0, 40.0);

        assert_eq!(
            allocate_ratio(&plan, &primary, Some(&secondary), ratio),
            allocate_ratio(&plan, &primary, Some(&secondary), ratio)
        );
    }

    #[test]
    fn batches_never_exceed_request() {
        let primary = tagged("p", 50);
        let secondary = tagged("s", 50);
        let plan = QuotaPlan::new(vec![7, 13, 0, 21, 9]);

        for batch in allocate_ratio(&plan, &primary, Some(&secondary), SplitRatio::new(33.0, 67.0))
        {
            assert!(batch.delivered() <= batch.requested);
        }
        for batch in allocate_pool(&plan, &primary) {
            assert!(batch.delivered() <= batch.requested);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Strict mode
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn ensure_complete_reports_first_short_day() {
        let batches = allocate_pool(&QuotaPlan::new(vec![2, 2, 2]), &tagged("u", 3));
        match ensure_complete(&batches) {
            Err(AppError::InsufficientRecords {
                day,
                requested,
                delivered,
            }) => {
                assert_eq!(day, 2);
                assert_eq!(requested, 2);
                assert_eq!(delivered, 1);
            }
            other => panic!("Expected InsufficientRecords, got {:?}", other),
        }
    }

    #[test]
    fn ensure_complete_accepts_full_allocation() {
        let batches = allocate_pool(&QuotaPlan::new(vec![1, 2]), &tagged("u", 3));
        assert!(ensure_complete(&batches).is_ok());
    }
}
