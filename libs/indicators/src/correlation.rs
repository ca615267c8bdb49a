//! Pearson correlation over the common trailing window of two series.

use std::collections::BTreeMap;

use types::candle::ensure_finite_values;
use types::errors::AnalyticsError;

/// Below this many overlapping points the correlation is reported as 0.
pub const MIN_CORRELATION_POINTS: usize = 10;

/// Pearson correlation of the last `min(len_a, len_b)` values of each series.
///
/// Returns 0 when fewer than [`MIN_CORRELATION_POINTS`] overlap or when
/// either window has zero variance.
pub fn correlation(a: &[f64], b: &[f64]) -> Result<f64, AnalyticsError> {
    ensure_finite_values(a)?;
    ensure_finite_values(b)?;

    let len = a.len().min(b.len());
    if len < MIN_CORRELATION_POINTS {
        return Ok(0.0);
    }

    let a = &a[a.len() - len..];
    let b = &b[b.len() - len..];
    let n = len as f64;

    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return Ok(0.0);
    }

    let r = cov / (var_a.sqrt() * var_b.sqrt());
    Ok(r.clamp(-1.0, 1.0))
}

/// Correlation for every ordered pair of `symbols`, keyed `"A-B"`.
///
/// Self-pairs are exactly 1. A symbol with no entry in `data` is treated as
/// an empty series.
pub fn correlation_matrix(
    symbols: &[String],
    data: &BTreeMap<String, Vec<f64>>,
) -> Result<BTreeMap<String, f64>, AnalyticsError> {
    let mut matrix = BTreeMap::new();
    for a in symbols {
        for b in symbols {
            let key = format!("{}-{}", a, b);
            let value = if a == b {
                1.0
            } else {
                let series_a = data.get(a).map(Vec::as_slice).unwrap_or(&[]);
                let series_b = data.get(b).map(Vec::as_slice).unwrap_or(&[]);
                correlation(series_a, series_b)?
            };
            matrix.insert(key, value);
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn series(n: usize, f: impl Fn(usize) -> f64) -> Vec<f64> {
        (0..n).map(f).collect()
    }

    #[test]
    fn test_self_correlation_is_one() {
        let a = series(30, |i| (i as f64 * 0.7).sin() * 10.0 + 100.0);
        assert!((correlation(&a, &a).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_inverse_correlation() {
        let a = series(20, |i| i as f64);
        let b = series(20, |i| -(i as f64) * 2.0);
        assert!((correlation(&a, &b).unwrap() + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_too_few_points_is_zero() {
        let a = series(9, |i| i as f64);
        assert_eq!(correlation(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_variance_is_zero() {
        let a = vec![5.0; 15];
        let b = series(15, |i| i as f64);
        assert_eq!(correlation(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_uses_common_trailing_window() {
        // `a` has an unrelated prefix; the trailing 12 values match `b` exactly.
        let mut a = vec![1000.0, -1000.0, 500.0];
        let b = series(12, |i| (i * i) as f64);
        a.extend(b.iter().copied());
        assert!((correlation(&a, &b).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut a = series(12, |i| i as f64);
        a[3] = f64::NAN;
        let b = series(12, |i| i as f64);
        assert!(matches!(
            correlation(&a, &b),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_matrix_includes_all_ordered_pairs() {
        let symbols = vec!["BTC".to_string(), "ETH".to_string()];
        let mut data = BTreeMap::new();
        data.insert("BTC".to_string(), series(20, |i| i as f64));
        data.insert("ETH".to_string(), series(20, |i| (i as f64) * 3.0 + 1.0));

        let matrix = correlation_matrix(&symbols, &data).unwrap();
        assert_eq!(matrix.len(), 4);
        assert_eq!(matrix["BTC-BTC"], 1.0);
        assert_eq!(matrix["ETH-ETH"], 1.0);
        assert_eq!(matrix["BTC-ETH"], matrix["ETH-BTC"]);
        assert!((matrix["BTC-ETH"] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_matrix_missing_symbol_is_empty_series() {
        let symbols = vec!["BTC".to_string(), "SOL".to_string()];
        let mut data = BTreeMap::new();
        data.insert("BTC".to_string(), series(20, |i| i as f64));

        let matrix = correlation_matrix(&symbols, &data).unwrap();
        assert_eq!(matrix["BTC-SOL"], 0.0);
        assert_eq!(matrix["SOL-SOL"], 1.0);
    }

    proptest! {
        #[test]
        fn prop_correlation_symmetric_and_bounded(
            a in prop::collection::vec(-1e6f64..1e6, 0..60),
            b in prop::collection::vec(-1e6f64..1e6, 0..60),
        ) {
            let ab = correlation(&a, &b).unwrap();
            let ba = correlation(&b, &a).unwrap();
            prop_assert_eq!(ab, ba);
            prop_assert!((-1.0..=1.0).contains(&ab));
        }
    }
}
