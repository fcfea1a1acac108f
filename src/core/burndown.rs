//! Sprint burndown aggregation.
//!
//! Day 0 of a sprint is the planning day; the rest are working days. Each
//! story contributes the remaining-work series entered in its size fields,
//! one value per edited day. The aggregator folds those series into one
//! sprint-level forecast and tracks how far into the sprint the forecast is
//! backed by explicit entries rather than carried-forward estimates.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BurndownError {
    #[error("series supplies {supplied} explicit days, but the consistency boundary is already {bound}")]
    InconsistentSeriesLength { supplied: usize, bound: usize },
}

/// Policy for a contributor whose series is longer than the boundary fixed
/// by the contributors folded before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Reject the aggregation. Day boundaries must only tighten as stories
    /// are folded in.
    #[default]
    Strict,
    /// Truncate the surplus days and keep folding.
    Lenient,
}

/// Aggregated remaining work per sprint day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BurndownSeries {
    /// Total remaining points, indexed by sprint day.
    pub total: Vec<u32>,
    /// Number of leading days for which every folded contributor supplied
    /// explicit values. Days beyond it are carried-forward estimates.
    pub last_consistent_day: usize,
}

/// Capacity verdict for the sprint: team capacity against the day-0
/// commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Feasibility {
    /// The team offers at least the committed points; `slack` is available
    /// for analysis and spikes.
    Feasible { slack: u32 },
    /// The commitment exceeds capacity; stories must shrink by `overcommit`
    /// points.
    Infeasible { overcommit: u32 },
}

/// Folds per-story remaining-work series into one sprint series.
///
/// Folding is order-sensitive: the consistency boundary and the length
/// check depend on which contributors came before.
#[derive(Debug)]
pub struct BurndownAggregator {
    total: Vec<u32>,
    last_consistent_day: usize,
    /// Tightest explicit series length seen so far; the strictness bound.
    /// Single-estimate contributors do not lower it.
    explicit_bound: usize,
    policy: LengthPolicy,
}

impl BurndownAggregator {
    pub fn new(days: usize, policy: LengthPolicy) -> Self {
        Self {
            total: vec![0; days],
            last_consistent_day: days,
            explicit_bound: days,
            policy,
        }
    }

    /// Fold one contributor's remaining-work series.
    ///
    /// An empty series contributes nothing. A single value is the planning
    /// estimate - it still folds (and carries forward), but nothing beyond
    /// day 0 is trustworthy afterwards, so the consistent range collapses
    /// to the planning day. Longer series add their explicit days and carry
    /// the last value into the unedited remainder of the sprint.
    pub fn fold(&mut self, series: &[u32]) -> Result<(), BurndownError> {
        let days = self.total.len();
        let mut supplied = series.len();

        if supplied == 0 {
            return Ok(());
        }
        if supplied == 1 {
            self.last_consistent_day = 0;
        } else {
            if supplied > self.explicit_bound {
                match self.policy {
                    LengthPolicy::Strict => {
                        return Err(BurndownError::InconsistentSeriesLength {
                            supplied,
                            bound: self.explicit_bound,
                        });
                    }
                    LengthPolicy::Lenient => {
                        warn!(
                            supplied,
                            bound = self.explicit_bound,
                            "series longer than the consistency boundary, truncating"
                        );
                        supplied = self.explicit_bound;
                        if supplied == 0 {
                            return Ok(());
                        }
                    }
                }
            }
            self.explicit_bound = supplied;
            self.last_consistent_day = self.last_consistent_day.min(supplied);
        }

        for (day, value) in series.iter().take(supplied.min(days)).enumerate() {
            self.total[day] += value;
        }
        // An unedited future day stays at the last explicit value.
        let carried = series[supplied - 1];
        for day in supplied..days {
            self.total[day] += carried;
        }
        Ok(())
    }

    pub fn finish(self) -> BurndownSeries {
        BurndownSeries {
            total: self.total,
            last_consistent_day: self.last_consistent_day,
        }
    }
}

impl BurndownSeries {
    /// Compare the day-0 commitment against team `capacity`.
    pub fn feasibility(&self, capacity: u32) -> Feasibility {
        let committed = self.total.first().copied().unwrap_or(0);
        if capacity >= committed {
            Feasibility::Feasible { slack: capacity - committed }
        } else {
            Feasibility::Infeasible { overcommit: committed - capacity }
        }
    }

    /// Fixed-size, non-overlapping slices of the series, one per reporting
    /// period of `periods + 1` days. Any remainder is truncated.
    pub fn period_summaries(&self, periods: u32) -> Vec<&[u32]> {
        self.total.chunks_exact(periods as usize + 1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_explicit_days_and_carries_the_last_value() {
        let mut agg = BurndownAggregator::new(5, LengthPolicy::Strict);
        agg.fold(&[10, 8, 6]).unwrap();
        let series = agg.finish();
        assert_eq!(series.total, vec![10, 8, 6, 6, 6]);
        assert_eq!(series.last_consistent_day, 3);
    }

    #[test]
    fn single_estimate_folds_but_collapses_consistency() {
        let mut agg = BurndownAggregator::new(5, LengthPolicy::Strict);
        agg.fold(&[10, 8, 6]).unwrap();
        agg.fold(&[4]).unwrap();
        let series = agg.finish();
        assert_eq!(series.total, vec![14, 12, 10, 10, 10]);
        assert_eq!(series.last_consistent_day, 0);
    }

    #[test]
    fn consistency_stays_collapsed_after_later_contributors() {
        let mut agg = BurndownAggregator::new(5, LengthPolicy::Strict);
        agg.fold(&[4]).unwrap();
        agg.fold(&[10, 8, 6]).unwrap();
        let series = agg.finish();
        assert_eq!(series.total, vec![14, 12, 10, 10, 10]);
        assert_eq!(series.last_consistent_day, 0);
    }

    #[test]
    fn empty_contributor_is_skipped() {
        let mut agg = BurndownAggregator::new(3, LengthPolicy::Strict);
        agg.fold(&[]).unwrap();
        agg.fold(&[5, 4]).unwrap();
        let series = agg.finish();
        assert_eq!(series.total, vec![5, 4, 4]);
        assert_eq!(series.last_consistent_day, 2);
    }

    #[test]
    fn strict_rejects_series_beyond_the_boundary() {
        let mut agg = BurndownAggregator::new(5, LengthPolicy::Strict);
        agg.fold(&[10, 8]).unwrap();
        let err = agg.fold(&[9, 7, 5]).unwrap_err();
        assert_eq!(err, BurndownError::InconsistentSeriesLength { supplied: 3, bound: 2 });
    }

    #[test]
    fn strict_rejects_series_longer_than_the_sprint() {
        let mut agg = BurndownAggregator::new(2, LengthPolicy::Strict);
        let err = agg.fold(&[5, 4, 3]).unwrap_err();
        assert_eq!(err, BurndownError::InconsistentSeriesLength { supplied: 3, bound: 2 });
    }

    #[test]
    fn lenient_truncates_instead_of_rejecting() {
        let mut agg = BurndownAggregator::new(5, LengthPolicy::Lenient);
        agg.fold(&[10, 8]).unwrap();
        agg.fold(&[9, 7, 5]).unwrap();
        let series = agg.finish();
        // The surplus third day is dropped; 7 carries forward instead of 5.
        assert_eq!(series.total, vec![19, 15, 15, 15, 15]);
        assert_eq!(series.last_consistent_day, 2);
    }

    #[test]
    fn series_matching_the_boundary_is_accepted() {
        let mut agg = BurndownAggregator::new(5, LengthPolicy::Strict);
        agg.fold(&[10, 8, 6]).unwrap();
        agg.fold(&[9, 7, 5]).unwrap();
        let series = agg.finish();
        assert_eq!(series.total, vec![19, 15, 11, 11, 11]);
        assert_eq!(series.last_consistent_day, 3);
    }

    #[test]
    fn feasible_when_capacity_covers_the_commitment() {
        let series = BurndownSeries { total: vec![14, 12, 10], last_consistent_day: 0 };
        assert_eq!(series.feasibility(20), Feasibility::Feasible { slack: 6 });
        assert_eq!(series.feasibility(14), Feasibility::Feasible { slack: 0 });
    }

    #[test]
    fn infeasible_when_the_commitment_exceeds_capacity() {
        let series = BurndownSeries { total: vec![14, 12, 10], last_consistent_day: 0 };
        assert_eq!(series.feasibility(10), Feasibility::Infeasible { overcommit: 4 });
    }

    #[test]
    fn period_summaries_truncate_the_remainder() {
        let series = BurndownSeries {
            total: vec![10, 9, 8, 7, 6, 5, 4],
            last_consistent_day: 7,
        };
        // periods = 2 gives chunks of 3 days; the seventh day is truncated.
        assert_eq!(series.period_summaries(2), vec![&[10, 9, 8][..], &[7, 6, 5][..]]);
    }

    #[test]
    fn zero_periods_summarize_day_by_day() {
        let series = BurndownSeries { total: vec![3, 2, 1], last_consistent_day: 3 };
        assert_eq!(series.period_summaries(0).len(), 3);
    }
}
