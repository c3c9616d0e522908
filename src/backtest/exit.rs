use chrono::NaiveTime;

use crate::data::IntradayBar;

/// Ratios outside this band between the daily close and the last 5-minute
/// close mean the two feeds disagree on a split.
const SPLIT_RATIO_HIGH: f64 = 1.5;
const SPLIT_RATIO_LOW: f64 = 0.7;

pub const fn hm(hour: u32, minute: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(t) => t,
        None => panic!("invalid wall-clock time"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

/// Yen P&L of 100 shares.
pub fn profit_per_100(entry: f64, exit: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Long => (exit - entry) * 100.0,
        Direction::Short => (entry - exit) * 100.0,
    }
}

/// How an exit price is read from one session's bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRule {
    /// Last close of the bars in `[start, end]`. If the slot is empty
    /// (limit-locked, halted), the open of the first bar at or after
    /// `fallback_open_from`.
    SlotClose {
        start: NaiveTime,
        end: NaiveTime,
        fallback_open_from: Option<NaiveTime>,
    },
    /// First bar at or after the time with a valid close.
    FirstCloseFrom(NaiveTime),
    /// Open of the bar starting exactly at the time.
    OpenAt(NaiveTime),
    /// The session's official close, from the daily table.
    DailyClose,
}

/// A resolved exit: price and the bar time it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub price: f64,
    pub at: Option<NaiveTime>,
}

impl ExitRule {
    /// Resolve against one session. `day_bars` must be sorted by time.
    pub fn resolve(&self, day_bars: &[IntradayBar], daily_close: Option<f64>) -> Option<ExitFill> {
        match *self {
            ExitRule::SlotClose {
                start,
                end,
                fallback_open_from,
            } => {
                let in_slot = day_bars
                    .iter()
                    .filter(|b| b.time() >= start && b.time() <= end)
                    .filter_map(|b| b.close.map(|c| (c, b.time())))
                    .last();
                if let Some((price, at)) = in_slot {
                    return Some(ExitFill {
                        price,
                        at: Some(at),
                    });
                }
                let from = fallback_open_from?;
                day_bars.iter().find(|b| b.time() >= from).map(|b| ExitFill {
                    price: b.open,
                    at: Some(b.time()),
                })
            }
            ExitRule::FirstCloseFrom(from) => day_bars
                .iter()
                .filter(|b| b.time() >= from)
                .find_map(|b| {
                    b.close.map(|price| ExitFill {
                        price,
                        at: Some(b.time()),
                    })
                }),
            ExitRule::OpenAt(at) => day_bars
                .iter()
                .find(|b| b.time() == at)
                .map(|b| ExitFill {
                    price: b.open,
                    at: Some(at),
                }),
            ExitRule::DailyClose => daily_close.map(|price| ExitFill { price, at: None }),
        }
    }

    /// Whether the price comes from 5-minute bars (and so needs split adjustment).
    pub fn is_intraday(&self) -> bool {
        !matches!(self, ExitRule::DailyClose)
    }
}

/// Factor that brings 5-minute prices onto the daily table's split basis.
///
/// Compares the daily close with the last 5-minute close from 14:55 on
/// (14:30 on if the tail is missing). Only a gap beyond the split band
/// counts; ordinary closing-auction drift returns 1.0.
pub fn split_adjustment(day_bars: &[IntradayBar], daily_close: Option<f64>) -> f64 {
    let Some(daily_close) = daily_close.filter(|c| *c > 0.0) else {
        return 1.0;
    };

    let last_close_from = |from: NaiveTime| {
        day_bars
            .iter()
            .filter(|b| b.time() >= from)
            .filter_map(|b| b.close)
            .last()
    };

    let Some(last_close) = last_close_from(hm(14, 55)).or_else(|| last_close_from(hm(14, 30)))
    else {
        return 1.0;
    };
    if last_close <= 0.0 {
        return 1.0;
    }

    let ratio = daily_close / last_close;
    if ratio > SPLIT_RATIO_HIGH || ratio < SPLIT_RATIO_LOW {
        ratio
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(h: u32, m: u32, open: f64, close: Option<f64>) -> IntradayBar {
        IntradayBar {
            ticker: "T".into(),
            ts: NaiveDate::from_ymd_opt(2025, 12, 1)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
            open,
            high: open,
            low: open,
            close,
            volume: 0.0,
        }
    }

    fn morning_early() -> ExitRule {
        ExitRule::SlotClose {
            start: hm(9, 0),
            end: hm(10, 25),
            fallback_open_from: Some(hm(10, 30)),
        }
    }

    #[test]
    fn test_profit_per_100_long_and_short() {
        assert_eq!(profit_per_100(1_000.0, 1_012.0, Direction::Long), 1_200.0);
        assert_eq!(profit_per_100(1_000.0, 1_012.0, Direction::Short), -1_200.0);
    }

    #[test]
    fn test_slot_close_takes_last_close_in_slot() {
        let bars = vec![
            bar(9, 0, 100.0, Some(101.0)),
            bar(10, 20, 104.0, Some(105.0)),
            bar(10, 25, 105.0, Some(106.0)),
            bar(10, 30, 107.0, Some(108.0)),
        ];
        let fill = morning_early().resolve(&bars, None).unwrap();
        assert_eq!(fill.price, 106.0);
        assert_eq!(fill.at, Some(hm(10, 25)));
    }

    #[test]
    fn test_slot_close_skips_nan_close_bars() {
        let bars = vec![bar(10, 20, 104.0, Some(105.0)), bar(10, 25, 105.0, None)];
        let fill = morning_early().resolve(&bars, None).unwrap();
        assert_eq!(fill.price, 105.0);
        assert_eq!(fill.at, Some(hm(10, 20)));
    }

    #[test]
    fn test_slot_close_falls_back_to_next_open() {
        // limit-locked all morning: first print at 10:45
        let bars = vec![bar(10, 45, 150.0, Some(149.0)), bar(10, 50, 149.0, Some(148.0))];
        let fill = morning_early().resolve(&bars, None).unwrap();
        assert_eq!(fill.price, 150.0);
        assert_eq!(fill.at, Some(hm(10, 45)));
    }

    #[test]
    fn test_slot_close_missing_when_no_bars_at_all() {
        assert_eq!(morning_early().resolve(&[], Some(100.0)), None);
        let no_fallback = ExitRule::SlotClose {
            start: hm(9, 0),
            end: hm(10, 25),
            fallback_open_from: None,
        };
        assert_eq!(no_fallback.resolve(&[bar(11, 0, 1.0, Some(1.0))], None), None);
    }

    #[test]
    fn test_first_close_from_skips_earlier_and_invalid_bars() {
        let bars = vec![
            bar(11, 25, 100.0, Some(100.0)),
            bar(12, 30, 101.0, None),
            bar(12, 35, 102.0, Some(103.0)),
        ];
        let fill = ExitRule::FirstCloseFrom(hm(11, 30)).resolve(&bars, None).unwrap();
        assert_eq!(fill.price, 103.0);
        assert_eq!(fill.at, Some(hm(12, 35)));
    }

    #[test]
    fn test_open_at_requires_exact_bar() {
        let bars = vec![bar(9, 30, 100.0, Some(101.0)), bar(9, 40, 102.0, Some(103.0))];
        assert_eq!(
            ExitRule::OpenAt(hm(9, 30)).resolve(&bars, None).unwrap().price,
            100.0
        );
        assert_eq!(ExitRule::OpenAt(hm(9, 35)).resolve(&bars, None), None);
    }

    #[test]
    fn test_daily_close_ignores_bars() {
        let fill = ExitRule::DailyClose.resolve(&[], Some(555.0)).unwrap();
        assert_eq!(fill, ExitFill { price: 555.0, at: None });
        assert!(!ExitRule::DailyClose.is_intraday());
        assert_eq!(ExitRule::DailyClose.resolve(&[], None), None);
    }

    #[test]
    fn test_split_adjustment_detects_split_gap() {
        // 5m feed unadjusted at 3000, daily adjusted to 1000 after a 1:3 split
        let bars = vec![bar(14, 55, 3_000.0, Some(3_000.0))];
        let f = split_adjustment(&bars, Some(1_000.0));
        assert!((f - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_split_adjustment_ignores_normal_drift() {
        let bars = vec![bar(14, 55, 1_000.0, Some(1_010.0))];
        assert_eq!(split_adjustment(&bars, Some(1_000.0)), 1.0);
    }

    #[test]
    fn test_split_adjustment_falls_back_to_1430_window() {
        let bars = vec![bar(14, 30, 500.0, Some(500.0)), bar(14, 40, 500.0, Some(500.0))];
        assert_eq!(split_adjustment(&bars, Some(1_000.0)), 2.0);
    }

    #[test]
    fn test_split_adjustment_neutral_without_data() {
        assert_eq!(split_adjustment(&[], Some(1_000.0)), 1.0);
        let bars = vec![bar(10, 0, 500.0, Some(500.0))];
        assert_eq!(split_adjustment(&bars, Some(1_000.0)), 1.0);
        assert_eq!(split_adjustment(&bars, None), 1.0);
    }
}
