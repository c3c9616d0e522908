use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::archive::ArchiveRecord;
use crate::price_limit::LimitState;

use super::segments::ProfitColumn;

/// Rank cut-off for the "top picks" bucket.
pub const TOP_RANK_BUCKET: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub label: String,
    /// Rows considered, with or without a value.
    pub total: usize,
    pub valid: usize,
    pub wins: usize,
    pub total_profit: f64,
    pub mean_profit: f64,
    /// Fraction of valid rows with profit > 0.
    pub win_rate: f64,
    /// Largest peak-to-trough fall of the cumulative P&L, in yen.
    pub max_drawdown: f64,
}

impl SegmentStats {
    /// Aggregate dated outcomes. Missing profits count toward `total` only.
    pub fn from_outcomes(label: impl Into<String>, outcomes: &[(Option<NaiveDate>, Option<f64>)]) -> Self {
        let mut valid: Vec<(Option<NaiveDate>, f64)> = outcomes
            .iter()
            .filter_map(|(date, p)| p.filter(|v| v.is_finite()).map(|v| (*date, v)))
            .collect();
        // stable: same-day rows keep archive order
        valid.sort_by_key(|(date, _)| *date);

        let wins = valid.iter().filter(|(_, p)| *p > 0.0).count();
        let total_profit: f64 = valid.iter().map(|(_, p)| p).sum();
        let n = valid.len();
        let profits: Vec<f64> = valid.into_iter().map(|(_, p)| p).collect();

        Self {
            label: label.into(),
            total: outcomes.len(),
            valid: n,
            wins,
            total_profit,
            mean_profit: if n > 0 { total_profit / n as f64 } else { 0.0 },
            win_rate: if n > 0 { wins as f64 / n as f64 } else { 0.0 },
            max_drawdown: compute_max_drawdown(&profits),
        }
    }
}

/// Peak-to-trough fall of the running sum of `profits`, starting flat.
pub fn compute_max_drawdown(profits: &[f64]) -> f64 {
    let mut equity = 0.0;
    let mut peak = 0.0;
    let mut max_dd = 0.0;

    for p in profits {
        equity += p;
        if equity > peak {
            peak = equity;
        }
        let dd = peak - equity;
        if dd > max_dd {
            max_dd = dd;
        }
    }

    max_dd
}

pub fn summarize(records: &[ArchiveRecord], column: ProfitColumn) -> SegmentStats {
    summarize_labeled(column.label(), records.iter(), column)
}

fn summarize_labeled<'a>(
    label: impl Into<String>,
    records: impl Iterator<Item = &'a ArchiveRecord>,
    column: ProfitColumn,
) -> SegmentStats {
    let outcomes: Vec<_> = records
        .map(|r| (r.backtest_date, column.value(r)))
        .collect();
    SegmentStats::from_outcomes(label, &outcomes)
}

pub fn summarize_all(records: &[ArchiveRecord]) -> Vec<SegmentStats> {
    ProfitColumn::all()
        .into_iter()
        .map(|col| summarize(records, col))
        .collect()
}

/// The column with the best mean profit among those with data.
pub fn best_by_mean(stats: &[SegmentStats]) -> Option<&SegmentStats> {
    stats
        .iter()
        .filter(|s| s.valid > 0)
        .max_by(|a, b| a.mean_profit.total_cmp(&b.mean_profit))
}

const WEEKDAYS: [(Weekday, &str); 5] = [
    (Weekday::Mon, "Mon"),
    (Weekday::Tue, "Tue"),
    (Weekday::Wed, "Wed"),
    (Weekday::Thu, "Thu"),
    (Weekday::Fri, "Fri"),
];

pub fn by_weekday(records: &[ArchiveRecord], column: ProfitColumn) -> Vec<SegmentStats> {
    WEEKDAYS
        .iter()
        .map(|(wd, name)| {
            let rows = records
                .iter()
                .filter(|r| r.backtest_date.map(|d| d.weekday()) == Some(*wd));
            summarize_labeled(*name, rows, column)
        })
        .filter(|s| s.total > 0)
        .collect()
}

pub fn by_rank_bucket(records: &[ArchiveRecord], column: ProfitColumn) -> Vec<SegmentStats> {
    let top = records
        .iter()
        .filter(|r| r.grok_rank.is_some_and(|k| k <= TOP_RANK_BUCKET));
    let rest = records
        .iter()
        .filter(|r| r.grok_rank.is_some_and(|k| k > TOP_RANK_BUCKET));
    let unranked = records.iter().filter(|r| r.grok_rank.is_none());

    [
        summarize_labeled(format!("rank 1-{TOP_RANK_BUCKET}"), top, column),
        summarize_labeled(format!("rank {}+", TOP_RANK_BUCKET + 1), rest, column),
        summarize_labeled("unranked", unranked, column),
    ]
    .into_iter()
    .filter(|s| s.total > 0)
    .collect()
}

pub fn by_price_limit(records: &[ArchiveRecord], column: ProfitColumn) -> Vec<SegmentStats> {
    let groups: [(Option<LimitState>, &str); 3] = [
        (Some(LimitState::StopHigh), "stop high"),
        (Some(LimitState::StopLow), "stop low"),
        (None, "no limit"),
    ];
    groups
        .into_iter()
        .map(|(state, name)| {
            let rows = records.iter().filter(move |r| r.price_limit == state);
            summarize_labeled(name, rows, column)
        })
        .filter(|s| s.total > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn rec(day: u32, rank: Option<u32>, phase2: Option<f64>) -> ArchiveRecord {
        ArchiveRecord {
            ticker: format!("{day}"),
            backtest_date: NaiveDate::from_ymd_opt(2025, 12, day),
            grok_rank: rank,
            profit_per_100_shares_phase2: phase2,
            ..ArchiveRecord::default()
        }
    }

    #[test]
    fn test_max_drawdown_absolute_yen() {
        assert_eq!(compute_max_drawdown(&[]), 0.0);
        assert_eq!(compute_max_drawdown(&[100.0, 200.0]), 0.0);
        // 0 -> 300 -> -200 -> 100
        assert_eq!(compute_max_drawdown(&[300.0, -500.0, 300.0]), 500.0);
        // losing from the start counts from flat
        assert_eq!(compute_max_drawdown(&[-100.0, -50.0]), 150.0);
    }

    #[test]
    fn test_summarize_counts_valid_and_wins() {
        let rows = vec![
            rec(1, Some(1), Some(1_000.0)),
            rec(2, Some(2), Some(-400.0)),
            rec(3, Some(3), None),
            rec(4, Some(4), Some(0.0)),
        ];
        let s = summarize(&rows, ProfitColumn::Phase2);
        assert_eq!(s.total, 4);
        assert_eq!(s.valid, 3);
        assert_eq!(s.wins, 1);
        assert!(approx_eq(s.total_profit, 600.0));
        assert!(approx_eq(s.mean_profit, 200.0));
        assert!(approx_eq(s.win_rate, 1.0 / 3.0));
        assert!(approx_eq(s.max_drawdown, 400.0));
    }

    #[test]
    fn test_drawdown_follows_date_order() {
        // archive order differs from date order
        let rows = vec![rec(3, None, Some(300.0)), rec(1, None, Some(-300.0))];
        let s = summarize(&rows, ProfitColumn::Phase2);
        assert!(approx_eq(s.max_drawdown, 300.0));
    }

    #[test]
    fn test_summarize_empty_column() {
        let s = summarize(&[rec(1, None, None)], ProfitColumn::Phase1);
        assert_eq!(s.valid, 0);
        assert_eq!(s.mean_profit, 0.0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(summarize_all(&[]).len(), 15);
    }

    #[test]
    fn test_best_by_mean_skips_empty_columns() {
        let rows = vec![rec(1, None, Some(-100.0))];
        let all = summarize_all(&rows);
        let best = best_by_mean(&all).unwrap();
        assert_eq!(best.label, ProfitColumn::Phase2.label());
    }

    #[test]
    fn test_group_by_weekday_and_rank() {
        // 2025-12-01 is a Monday
        let rows = vec![
            rec(1, Some(1), Some(100.0)),
            rec(2, Some(7), Some(-100.0)),
            rec(8, None, Some(50.0)),
        ];
        let wd = by_weekday(&rows, ProfitColumn::Phase2);
        assert_eq!(wd.len(), 2);
        assert_eq!(wd[0].label, "Mon");
        assert_eq!(wd[0].valid, 2);
        assert_eq!(wd[1].label, "Tue");

        let ranks = by_rank_bucket(&rows, ProfitColumn::Phase2);
        let labels: Vec<&str> = ranks.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["rank 1-5", "rank 6+", "unranked"]);
        assert!(approx_eq(ranks[1].total_profit, -100.0));
    }

    #[test]
    fn test_group_by_price_limit() {
        let mut hit = rec(1, Some(1), Some(-2_000.0));
        hit.price_limit = Some(LimitState::StopHigh);
        let rows = vec![hit, rec(2, Some(2), Some(500.0))];
        let groups = by_price_limit(&rows, ProfitColumn::Phase2);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "stop high");
        assert_eq!(groups[0].wins, 0);
        assert_eq!(groups[1].label, "no limit");
        assert_eq!(groups[1].wins, 1);
    }
}
