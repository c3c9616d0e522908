/// Compute the simple moving average over the last `window` values.
/// Returns None if there isn't enough data.
pub fn simple_moving_average(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }

    let start = values.len() - window;
    let slice = &values[start..];
    let sum: f64 = slice.iter().copied().sum();
    Some(sum / window as f64)
}

/// Deviation of the last value from its SMA, in percent.
/// `(price - sma) / sma * 100`
pub fn deviation_from_sma_pct(values: &[f64], window: usize) -> Option<f64> {
    let sma = simple_moving_average(values, window)?;
    let last = *values.last()?;
    if sma == 0.0 {
        return None;
    }
    Some((last - sma) / sma * 100.0)
}
