use serde::Serialize;

use crate::data::DailyBar;

use super::atr::atr_percent;
use super::rsi::rsi;
use super::sma::{deviation_from_sma_pct, simple_moving_average};
use super::volume::volume_ratio;

pub const RSI_PERIOD: usize = 14;
pub const VOLUME_PERIOD: usize = 20;
pub const SMA_SHORT_PERIOD: usize = 5;
pub const ATR_PERIOD: usize = 14;

/// Indicators as of the last bar of a history slice.
///
/// For a backtest date the slice must end the session BEFORE that date,
/// so every value was known at the 09:00 open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TechnicalSnapshot {
    pub prev_day_close: Option<f64>,
    /// Percent units (+3.5 = +3.5%).
    pub prev_day_change_pct: Option<f64>,
    pub rsi_14d: Option<f64>,
    pub volume_change_20d: Option<f64>,
    pub sma_5d: Option<f64>,
    pub price_vs_sma5_pct: Option<f64>,
    pub atr14_pct: Option<f64>,
}

impl TechnicalSnapshot {
    pub fn from_history(bars: &[DailyBar]) -> Self {
        let Some(last) = bars.last() else {
            return Self::default();
        };

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let prev_day_change_pct = closes
            .len()
            .checked_sub(2)
            .map(|i| closes[i])
            .filter(|p| *p > 0.0)
            .map(|p| (last.close / p - 1.0) * 100.0);

        Self {
            prev_day_close: Some(last.close),
            prev_day_change_pct,
            rsi_14d: rsi(&closes, RSI_PERIOD),
            volume_change_20d: volume_ratio(&volumes, VOLUME_PERIOD),
            sma_5d: simple_moving_average(&closes, SMA_SHORT_PERIOD),
            price_vs_sma5_pct: deviation_from_sma_pct(&closes, SMA_SHORT_PERIOD),
            atr14_pct: atr_percent(bars, ATR_PERIOD),
        }
    }
}
