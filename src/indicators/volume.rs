use super::sma::simple_moving_average;

/// Latest volume relative to its `period`-bar average (1.0 = average day).
pub fn volume_ratio(volumes: &[f64], period: usize) -> Option<f64> {
    let avg = simple_moving_average(volumes, period)?;
    if avg <= 0.0 {
        return None;
    }
    Some(*volumes.last()? / avg)
}
