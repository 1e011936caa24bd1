//! Rolling-window indicators over an oldest-to-newest candle window.
//!
//! Every function looks only at the trailing end of its input and returns
//! `None` when the window cannot be filled or a sample is poisoned.

use itertools::Itertools;

use crate::domain::Candle;
use crate::utils::{mean, mean_and_sample_stddev};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// `ln(close_i / close_{i-1})` for each consecutive pair.
/// A pair with a non-positive close has no defined log and yields `None`.
pub fn log_returns(closes: &[f64]) -> Vec<Option<f64>> {
    closes
        .iter()
        .tuple_windows()
        .map(|(&prev, &curr)| {
            if prev > 0.0 && curr > 0.0 {
                let r = (curr / prev).ln();
                r.is_finite().then_some(r)
            } else {
                None
            }
        })
        .collect()
}

/// Annualized sample standard deviation of the last `window` log returns.
///
/// `None` if fewer than `window` returns exist, the window is shorter than two
/// returns, or any return in the window is poisoned.
pub fn realized_volatility(
    returns: &[Option<f64>],
    window: usize,
    annualization_factor: f64,
) -> Option<f64> {
    if window < 2 || returns.len() < window {
        return None;
    }
    let tail: Option<Vec<f64>> = returns[returns.len() - window..].iter().copied().collect();
    let (_, stddev) = mean_and_sample_stddev(&tail?)?;
    let vol = stddev * annualization_factor.sqrt();
    vol.is_finite().then_some(vol)
}

/// SMA of the last `window` closes, ± `k` sample standard deviations.
pub fn bollinger_bands(closes: &[f64], window: usize, k: f64) -> Option<BollingerBands> {
    if window < 2 || closes.len() < window {
        return None;
    }
    let (middle, stddev) = mean_and_sample_stddev(&closes[closes.len() - window..])?;
    let bands = BollingerBands {
        upper: middle + k * stddev,
        middle,
        lower: middle - k * stddev,
    };
    [bands.upper, bands.middle, bands.lower]
        .iter()
        .all(|v| v.is_finite())
        .then_some(bands)
}

/// True range of every candle after the first (the first has no previous close).
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .tuple_windows()
        .map(|(prev, curr)| curr.true_range(prev.close))
        .collect()
}

/// Simple moving average of the last `window` true ranges.
pub fn average_true_range(candles: &[Candle], window: usize) -> Option<f64> {
    if window == 0 {
        return None;
    }
    let tr = true_ranges(candles);
    if tr.len() < window {
        return None;
    }
    mean(&tr[tr.len() - window..]).filter(|v| v.is_finite())
}

/// `(close_now - close_window_ago) / close_window_ago`. Needs `window + 1` closes.
pub fn momentum(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let now = closes[closes.len() - 1];
    let then = closes[closes.len() - 1 - window];
    if then == 0.0 {
        return None;
    }
    let m = (now - then) / then;
    m.is_finite().then_some(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(n: usize, price: f64) -> Vec<f64> {
        vec![price; n]
    }

    fn bar(ts: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts, close, high, low, close, 1.0)
    }

    #[test]
    fn constant_series_has_zero_volatility() {
        let returns = log_returns(&flat(30, 100.0));
        assert_eq!(returns.len(), 29);
        for w in [2, 4, 24] {
            assert_eq!(realized_volatility(&returns, w, 8760.0), Some(0.0));
        }
    }

    #[test]
    fn volatility_windows_null_out_independently() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let returns = log_returns(&closes);
        assert!(realized_volatility(&returns, 4, 8760.0).is_some());
        assert!(realized_volatility(&returns, 9, 8760.0).is_some());
        assert!(realized_volatility(&returns, 10, 8760.0).is_none());
    }

    #[test]
    fn non_positive_close_poisons_only_windows_that_touch_it() {
        let mut closes = flat(30, 100.0);
        closes[5] = 0.0;
        let returns = log_returns(&closes);
        assert!(returns[4].is_none());
        assert!(returns[5].is_none());
        // last 24 returns span indices 5..=28, which include a poisoned one
        assert!(realized_volatility(&returns, 24, 8760.0).is_none());
        assert_eq!(realized_volatility(&returns, 4, 8760.0), Some(0.0));
    }

    #[test]
    fn volatility_matches_hand_computation() {
        let closes = [100.0, 101.0, 99.0, 102.0];
        let returns = log_returns(&closes);
        let r: Vec<f64> = returns.iter().map(|r| r.unwrap()).collect();
        let m = r.iter().sum::<f64>() / 3.0;
        let var = r.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 2.0;
        let expected = var.sqrt() * 8760f64.sqrt();
        let got = realized_volatility(&returns, 3, 8760.0).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn bollinger_needs_full_window() {
        assert!(bollinger_bands(&flat(19, 50.0), 20, 2.0).is_none());
        let bands = bollinger_bands(&flat(20, 50.0), 20, 2.0).unwrap();
        assert_eq!(bands.middle, 50.0);
        assert_eq!(bands.upper, 50.0);
        assert_eq!(bands.lower, 50.0);
    }

    #[test]
    fn bollinger_uses_sample_stddev() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let bands = bollinger_bands(&closes, 20, 2.0).unwrap();
        assert!((bands.middle - 10.5).abs() < 1e-12);
        // sample variance of 1..=20 is 35
        let sd = 35f64.sqrt();
        assert!((bands.upper - (10.5 + 2.0 * sd)).abs() < 1e-9);
        assert!((bands.lower - (10.5 - 2.0 * sd)).abs() < 1e-9);
    }

    #[test]
    fn true_range_picks_largest_leg() {
        let prev = bar(0, 9.0, 9.0, 9.0);
        let curr = bar(1, 10.0, 8.0, 9.0);
        assert_eq!(true_ranges(&[prev, curr]), vec![2.0]);
        // gap up: |high - prev_close| dominates
        let gap = bar(2, 15.0, 14.0, 14.5);
        assert_eq!(gap.true_range(9.0), 6.0);
    }

    #[test]
    fn atr_of_identical_ranges() {
        // 15 candles -> 14 true ranges, first candle contributes none
        let candles: Vec<Candle> = (0..15).map(|i| bar(i, 10.0, 8.0, 9.0)).collect();
        assert_eq!(average_true_range(&candles, 14), Some(2.0));
        assert!(average_true_range(&candles[1..], 14).is_none());
    }

    #[test]
    fn momentum_example() {
        let mut closes = flat(12, 100.0);
        closes.push(110.0);
        let m = momentum(&closes, 12).unwrap();
        assert!((m - 0.10).abs() < 1e-12);
        assert!(momentum(&closes[1..], 12).is_none());
    }

    #[test]
    fn momentum_zero_divisor_is_null() {
        let mut closes = vec![0.0];
        closes.extend(flat(12, 5.0));
        assert!(momentum(&closes, 12).is_none());
    }
}
