use statrs::statistics::Statistics;
use std::time::Duration;

/// Converts a Duration into a specific number of candles based on the interval.
pub(crate) fn duration_to_candles(duration: Duration, interval_secs: i64) -> usize {
    if interval_secs <= 0 {
        return 0;
    }
    (duration.as_secs() as i64 / interval_secs) as usize
}

/// Arithmetic mean. `None` for an empty slice.
#[inline]
pub(crate) fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Mean and sample standard deviation (divisor `n - 1`).
/// Needs at least two points.
#[inline]
pub(crate) fn mean_and_sample_stddev(data: &[f64]) -> Option<(f64, f64)> {
    if data.len() < 2 {
        return None;
    }
    let mean = mean(data)?;
    let stddev = data.std_dev();
    if !stddev.is_finite() {
        return None;
    }
    Some((mean, stddev))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stddev_uses_n_minus_one() {
        let (m, s) = mean_and_sample_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(m, 5.0);
        // population stddev would be exactly 2.0
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_point_has_no_sample_stddev() {
        assert!(mean_and_sample_stddev(&[1.0]).is_none());
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn duration_to_candles_floors() {
        assert_eq!(duration_to_candles(Duration::from_secs(4 * 3600), 3600), 4);
        assert_eq!(duration_to_candles(Duration::from_secs(3600), 86_400), 0);
        assert_eq!(duration_to_candles(Duration::from_secs(3600), 0), 0);
    }
}
