use crate::error::{CovidError, Result};

/// Day-over-day differences of a cumulative series.
///
/// The day before the first row is taken as 0, so `out[0] == cumulative[0]`
/// and the output has the same length as the input.
pub fn daily_deltas(cumulative: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    cumulative
        .iter()
        .map(|&c| {
            let d = c - prev;
            prev = c;
            d
        })
        .collect()
}

/// Inverse of [`daily_deltas`].
pub fn cumulative_sum(deltas: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    deltas
        .iter()
        .map(|&d| {
            total += d;
            total
        })
        .collect()
}

/// Unweighted trailing moving average, "valid" mode.
///
/// Value `k` is the mean of `data[k..k + window]`, so the output has
/// `data.len() - window + 1` values and lines up with day `window - 1`.
pub fn running_average(data: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 || window > data.len() {
        return Err(CovidError::InvalidWindowSize {
            window,
            len: data.len(),
        });
    }
    let w = window as f64;
    Ok(data
        .windows(window)
        .map(|chunk| chunk.iter().sum::<f64>() / w)
        .collect())
}

/// Elementwise `num / den * factor`. Days with a zero denominator are NaN.
pub fn ratio(num: &[f64], den: &[f64], factor: f64) -> Vec<f64> {
    debug_assert_eq!(num.len(), den.len());
    num.iter()
        .zip(den.iter())
        .map(|(&n, &d)| if d == 0.0 { f64::NAN } else { n / d * factor })
        .collect()
}

/// Optionally divide by `by` elementwise, then multiply by `factor`.
pub fn scale(values: &[f64], by: Option<&[f64]>, factor: f64) -> Vec<f64> {
    match by {
        Some(by) => ratio(values, by, factor),
        None => values.iter().map(|v| v * factor).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_deltas_prepends_zero() {
        assert_eq!(
            daily_deltas(&[10.0, 15.0, 15.0, 20.0]),
            vec![10.0, 5.0, 0.0, 5.0]
        );
        assert!(daily_deltas(&[]).is_empty());
    }

    #[test]
    fn test_cumulative_sum_reconstructs_totals() {
        let totals = vec![3.0, 3.0, 7.0, 12.0, 40.0, 41.0];
        assert_eq!(cumulative_sum(&daily_deltas(&totals)), totals);
    }

    #[test]
    fn test_running_average_valid_mode() {
        let avg = running_average(&[2.0, 4.0, 6.0, 8.0, 10.0], 3).unwrap();
        assert_eq!(avg, vec![4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_running_average_length() {
        let data: Vec<f64> = (0..20).map(|i| i as f64).collect();
        for window in 1..=20 {
            let avg = running_average(&data, window).unwrap();
            assert_eq!(avg.len(), data.len() - window + 1);
        }
    }

    #[test]
    fn test_running_average_uses_float_division() {
        let avg = running_average(&[1.0, 2.0], 2).unwrap();
        assert_eq!(avg, vec![1.5]);
    }

    #[test]
    fn test_running_average_rejects_bad_window() {
        assert!(matches!(
            running_average(&[1.0, 2.0, 3.0], 4),
            Err(CovidError::InvalidWindowSize { window: 4, len: 3 })
        ));
        assert!(matches!(
            running_average(&[1.0, 2.0, 3.0], 0),
            Err(CovidError::InvalidWindowSize { window: 0, .. })
        ));
        assert!(running_average(&[], 1).is_err());
    }

    #[test]
    fn test_ratio_zero_denominator_is_nan() {
        let r = ratio(&[0.0, 1.0, 3.0], &[0.0, 4.0, 0.0], 100.0);
        assert!(r[0].is_nan());
        assert_eq!(r[1], 25.0);
        assert!(r[2].is_nan());
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(&[1.0, 2.0], None, 3.0), vec![3.0, 6.0]);
        assert_eq!(
            scale(&[2.0, 6.0], Some(&[4.0, 4.0][..]), 3.0),
            vec![1.5, 4.5]
        );
    }
}
