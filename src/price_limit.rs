//! JPX daily price limits (制限値幅).

use serde::{Deserialize, Serialize};

use crate::data::DailyBar;

/// (upper bound of the base price, limit width), both in yen.
const PRICE_LIMIT_TABLE: [(f64, f64); 17] = [
    (100.0, 30.0),
    (200.0, 50.0),
    (500.0, 80.0),
    (700.0, 100.0),
    (1_000.0, 150.0),
    (1_500.0, 300.0),
    (2_000.0, 400.0),
    (3_000.0, 500.0),
    (5_000.0, 700.0),
    (7_000.0, 1_000.0),
    (10_000.0, 1_500.0),
    (15_000.0, 3_000.0),
    (20_000.0, 4_000.0),
    (30_000.0, 5_000.0),
    (50_000.0, 7_000.0),
    (70_000.0, 10_000.0),
    (100_000.0, 15_000.0),
];

const PRICE_LIMIT_OVER_100K: f64 = 30_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitState {
    StopHigh,
    StopLow,
}

/// Limit width for a base price (the previous close).
pub fn price_limit(base: f64) -> f64 {
    if base <= 0.0 {
        return 0.0;
    }
    PRICE_LIMIT_TABLE
        .iter()
        .find(|(threshold, _)| base <= *threshold)
        .map(|(_, limit)| *limit)
        .unwrap_or(PRICE_LIMIT_OVER_100K)
}

pub fn upper_limit_price(base: f64) -> f64 {
    base + price_limit(base)
}

pub fn lower_limit_price(base: f64) -> f64 {
    (base - price_limit(base)).max(1.0)
}

/// Worst-case cash needed for a 100-share market buy.
pub fn max_cost_100(base: f64) -> f64 {
    upper_limit_price(base) * 100.0
}

/// Did the session close locked at its limit?
pub fn limit_state(prev_close: f64, bar: &DailyBar) -> Option<LimitState> {
    if prev_close <= 0.0 {
        return None;
    }
    let upper = upper_limit_price(prev_close);
    let lower = lower_limit_price(prev_close);
    if bar.high >= upper && bar.close >= upper {
        Some(LimitState::StopHigh)
    } else if bar.low <= lower && bar.close <= lower {
        Some(LimitState::StopLow)
    } else {
        None
    }
}
