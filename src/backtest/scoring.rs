//! Next-session scoring heuristics for trending picks.
//!
//! Each model reads what was known before the open (previous close,
//! daily indicators, the pick's rank) and proposes BUY, SELL or HOLD.

use std::fmt;

use serde::Serialize;

use crate::archive::ArchiveRecord;
use crate::indicators::TechnicalSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDecision {
    pub score_buy: i32,
    /// Negative is bearish. Single-score models copy `score_buy` here.
    pub score_sell: i32,
    pub action: Action,
    pub reasons: Vec<String>,
    /// A BUY suppressed by the minimum-price filter.
    pub price_filtered: bool,
}

/// What a model may look at.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoringInput {
    /// Previous session's close.
    pub price: Option<f64>,
    pub prev_day_change_pct: Option<f64>,
    pub rsi_14d: Option<f64>,
    pub volume_change_20d: Option<f64>,
    pub price_vs_sma5_pct: Option<f64>,
    pub grok_rank: Option<u32>,
    pub total_stocks: Option<u32>,
}

impl ScoringInput {
    pub fn from_snapshot(snap: &TechnicalSnapshot) -> Self {
        Self {
            price: snap.prev_day_close,
            prev_day_change_pct: snap.prev_day_change_pct,
            rsi_14d: snap.rsi_14d,
            volume_change_20d: snap.volume_change_20d,
            price_vs_sma5_pct: snap.price_vs_sma5_pct,
            grok_rank: None,
            total_stocks: None,
        }
    }

    pub fn from_record(rec: &ArchiveRecord) -> Self {
        Self {
            grok_rank: rec.grok_rank,
            total_stocks: rec.total_stocks,
            ..Self::from_snapshot(&rec.snapshot())
        }
    }

    /// 0.0 for the top pick, 1.0 for the last one.
    pub fn rank_position(&self) -> Option<f64> {
        let rank = self.grok_rank?;
        let total = self.total_stocks?;
        if rank == 0 || total == 0 {
            return None;
        }
        if total == 1 {
            return Some(0.0);
        }
        Some((rank.min(total) - 1) as f64 / (total - 1) as f64)
    }
}

pub trait ScoringModel: Sync {
    fn name(&self) -> &'static str;
    fn score(&self, input: &ScoringInput) -> ScoreDecision;
}

const BUY_THRESHOLD: i32 = 30;
const SELL_THRESHOLD: i32 = -20;

/// Prices in [5,000, 10,000) have been reliable buys, five-digit prices reliable sells.
const BAND_BUY_LOW: f64 = 5_000.0;
const BAND_SELL_FROM: f64 = 10_000.0;

fn price_band(input: &ScoringInput) -> Option<ScoreDecision> {
    let price = input.price?;
    let (score, action) = if price >= BAND_SELL_FROM {
        (-100, Action::Sell)
    } else if price >= BAND_BUY_LOW {
        (100, Action::Buy)
    } else {
        return None;
    };
    Some(ScoreDecision {
        score_buy: score,
        score_sell: score,
        action,
        reasons: vec![format!("price band {price:.0} yen")],
        price_filtered: false,
    })
}

fn prev_day_change_factor(input: &ScoringInput, score: &mut i32, reasons: &mut Vec<String>) {
    let Some(chg) = input.prev_day_change_pct else {
        return;
    };
    if chg < -5.0 {
        *score += 15;
        reasons.push(format!("previous day {chg:+.1}% (rebound candidate)"));
    } else if chg > 10.0 {
        *score -= 10;
        reasons.push(format!("previous day {chg:+.1}% (overextended)"));
    }
}

fn threshold_decision(score: i32, reasons: Vec<String>) -> ScoreDecision {
    let action = if score >= BUY_THRESHOLD {
        Action::Buy
    } else if score <= SELL_THRESHOLD {
        Action::Sell
    } else {
        Action::Hold
    };
    ScoreDecision {
        score_buy: score,
        score_sell: score,
        action,
        reasons,
        price_filtered: false,
    }
}

/// Rank-weighted baseline.
pub struct V203;

impl ScoringModel for V203 {
    fn name(&self) -> &'static str {
        "v2.0.3"
    }

    fn score(&self, input: &ScoringInput) -> ScoreDecision {
        if let Some(forced) = price_band(input) {
            return forced;
        }
        let mut score = 0;
        let mut reasons = Vec::new();

        if let Some(pos) = input.rank_position() {
            let pts = if pos <= 0.25 {
                40
            } else if pos <= 0.50 {
                20
            } else if pos <= 0.75 {
                0
            } else {
                -10
            };
            score += pts;
            reasons.push(format!("rank position {:.0}% ({pts:+})", pos * 100.0));
        }
        prev_day_change_factor(input, &mut score, &mut reasons);

        threshold_decision(score, reasons)
    }
}

/// Rank plus oscillator and volume confirmations.
pub struct V210;

impl ScoringModel for V210 {
    fn name(&self) -> &'static str {
        "v2.1.0"
    }

    fn score(&self, input: &ScoringInput) -> ScoreDecision {
        if let Some(forced) = price_band(input) {
            return forced;
        }
        let mut score = 0;
        let mut reasons = Vec::new();

        if let Some(pos) = input.rank_position() {
            let pts = if pos <= 0.25 {
                50
            } else if pos <= 0.50 {
                30
            } else if pos <= 0.75 {
                0
            } else {
                -30
            };
            score += pts;
            reasons.push(format!("rank position {:.0}% ({pts:+})", pos * 100.0));
        }
        if let Some(rsi) = input.rsi_14d {
            if rsi < 30.0 {
                score += 20;
                reasons.push(format!("RSI {rsi:.1} (oversold)"));
            } else if rsi > 70.0 {
                score -= 10;
                reasons.push(format!("RSI {rsi:.1} (overbought)"));
            }
        }
        if let Some(vol) = input.volume_change_20d.filter(|v| *v > 2.0) {
            score += 15;
            reasons.push(format!("volume {vol:.2}x 20d average"));
        }
        if let Some(dev) = input
            .price_vs_sma5_pct
            .filter(|d| *d > -2.0 && *d < 0.0)
        {
            score += 15;
            reasons.push(format!("SMA5 {dev:+.1}% (shallow pullback)"));
        }
        prev_day_change_factor(input, &mut score, &mut reasons);

        threshold_decision(score, reasons)
    }
}

/// Separate buy/sell scores from per-bucket historical P&L, with a
/// minimum price for buys.
pub struct V215;

impl V215 {
    pub const BUY_THRESHOLD: i32 = 25;
    pub const SELL_THRESHOLD: i32 = -15;
    pub const MIN_PRICE_FOR_BUY: f64 = 1_000.0;

    fn rsi_points(rsi: f64, buy: &mut i32, sell: &mut i32, reasons: &mut Vec<String>) {
        if rsi < 10.0 {
            *buy += 50;
            reasons.push(format!("RSI {rsi:.1} (extreme oversold)"));
        } else if rsi < 20.0 {
            // bucket lost money on average
        } else if rsi < 30.0 {
            *buy += 15;
            reasons.push(format!("RSI {rsi:.1} (oversold)"));
        } else if rsi < 40.0 {
            *buy += 15;
            reasons.push(format!("RSI {rsi:.1} (mildly oversold)"));
        } else if rsi >= 80.0 {
            *sell -= 5;
        } else if rsi >= 70.0 {
            *buy -= 10;
            *sell -= 10;
            reasons.push(format!("RSI {rsi:.1} (overbought)"));
        } else if rsi >= 60.0 {
            *buy -= 15;
            *sell -= 15;
            reasons.push(format!("RSI {rsi:.1} (mildly overbought)"));
        } else if rsi >= 50.0 {
            *buy -= 10;
        }
    }

    fn volume_points(vol: f64, buy: &mut i32, reasons: &mut Vec<String>) {
        if vol < 0.5 {
            *buy -= 20;
            reasons.push(format!("volume {vol:.2}x (dried up)"));
        } else if vol < 0.8 {
            *buy += 10;
            reasons.push(format!("volume {vol:.2}x (quiet)"));
        } else if vol < 1.0 {
        } else if vol < 1.2 {
            *buy += 5;
        } else if vol < 1.5 {
            *buy -= 20;
            reasons.push(format!("volume {vol:.2}x (danger zone)"));
        } else if vol < 2.0 {
        } else if vol < 3.0 {
            *buy += 5;
            reasons.push(format!("volume {vol:.1}x (active)"));
        } else {
            *buy -= 15;
        }
    }

    fn sma5_points(dev: f64, buy: &mut i32, reasons: &mut Vec<String>) {
        if dev < -10.0 {
            *buy += 80;
            reasons.push(format!("SMA5 {dev:.1}% (deep pullback)"));
        } else if dev < 0.0 {
        } else if dev < 2.0 {
            *buy += 5;
        } else if dev < 5.0 {
            *buy -= 15;
        } else if dev < 10.0 {
            *buy -= 30;
            reasons.push(format!("SMA5 {dev:+.1}% (overheated)"));
        } else {
            *buy -= 100;
            reasons.push(format!("SMA5 {dev:+.1}% (blow-off)"));
        }
    }
}

impl ScoringModel for V215 {
    fn name(&self) -> &'static str {
        "v2.1.5"
    }

    fn score(&self, input: &ScoringInput) -> ScoreDecision {
        let mut buy = 0;
        let mut sell = 0;
        let mut reasons = Vec::new();

        if let Some(rsi) = input.rsi_14d {
            Self::rsi_points(rsi, &mut buy, &mut sell, &mut reasons);
        }
        if let Some(vol) = input.volume_change_20d {
            Self::volume_points(vol, &mut buy, &mut reasons);
        }
        if let Some(dev) = input.price_vs_sma5_pct {
            Self::sma5_points(dev, &mut buy, &mut reasons);
        }

        let mut price_filtered = false;
        let action = if buy >= Self::BUY_THRESHOLD {
            let price = input.price.unwrap_or(0.0);
            if price < Self::MIN_PRICE_FOR_BUY {
                price_filtered = true;
                reasons.push(format!("price {price:.0} yen below buy minimum"));
                Action::Hold
            } else {
                Action::Buy
            }
        } else if sell <= Self::SELL_THRESHOLD {
            Action::Sell
        } else {
            Action::Hold
        };

        ScoreDecision {
            score_buy: buy,
            score_sell: sell,
            action,
            reasons,
            price_filtered,
        }
    }
}

pub fn all_models() -> Vec<Box<dyn ScoringModel>> {
    vec![Box::new(V203), Box::new(V210), Box::new(V215)]
}

pub fn model_by_name(name: &str) -> Option<Box<dyn ScoringModel>> {
    let wanted = name.trim().trim_start_matches('v');
    all_models()
        .into_iter()
        .find(|m| m.name().trim_start_matches('v') == wanted)
}
