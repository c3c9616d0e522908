use crate::data::DailyBar;

/// True range of a bar given the previous close.
/// Without a previous close it degrades to `high - low`.
pub fn true_range(bar: &DailyBar, prev_close: Option<f64>) -> f64 {
    let hl = bar.high - bar.low;
    match prev_close {
        Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        None => hl,
    }
}

/// Mean true range over the last `period` bars.
///
/// The first bar of the slice has no previous close, so its TR is `high - low`.
pub fn atr(bars: &[DailyBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }

    let n = bars.len();
    let sum_tr: f64 = (n - period..n)
        .map(|i| {
            let prev = if i == 0 { None } else { Some(bars[i - 1].close) };
            true_range(&bars[i], prev)
        })
        .sum();

    Some(sum_tr / period as f64)
}

/// ATR as a percentage of the last close, rounded to 2 decimals (e.g. 3.14 = 3.14%).
pub fn atr_percent(bars: &[DailyBar], period: usize) -> Option<f64> {
    let atr_val = atr(bars, period)?;
    let last_close = bars.last()?.close;
    if last_close <= 0.0 {
        return None;
    }
    Some((atr_val / last_close * 100.0 * 100.0).round() / 100.0)
}
