/// RSI from simple (not Wilder-smoothed) averages of the last `period` moves.
///
/// - All-gain window: 100.
/// - Flat window: None, there is no direction to measure.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let n = closes.len();
    let (gain, loss) = (n - period..n).fold((0.0, 0.0), |(g, l), i| {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });

    let avg_gain = gain / period as f64;
    let avg_loss = loss / period as f64;

    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { None } else { Some(100.0) };
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() <= eps,
            "expected {b}, got {a} (diff = {})",
            (a - b).abs()
        );
    }

    #[test]
    fn test_rsi_none_when_not_enough_data() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], 3), None);
        assert_eq!(rsi(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn test_rsi_balanced_moves_is_fifty() {
        // +2, -2 -> avg gain == avg loss
        let r = rsi(&[100.0, 102.0, 100.0], 2).unwrap();
        approx_eq(r, 50.0, 1e-9);
    }

    #[test]
    fn test_rsi_uses_only_last_period_moves() {
        // moves: -50 (ignored), +3, -1, +2 -> gain 5, loss 1 over 3
        // rs = 5, rsi = 100 - 100/6
        let r = rsi(&[150.0, 100.0, 103.0, 102.0, 104.0], 3).unwrap();
        approx_eq(r, 100.0 - 100.0 / 6.0, 1e-9);
    }

    #[test]
    fn test_rsi_all_gains_is_hundred_and_flat_is_none() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0, 4.0], 3), Some(100.0));
        assert_eq!(rsi(&[5.0, 5.0, 5.0, 5.0], 3), None);
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let r = rsi(&[4.0, 3.0, 2.0, 1.0], 3).unwrap();
        approx_eq(r, 0.0, 1e-12);
    }
}
