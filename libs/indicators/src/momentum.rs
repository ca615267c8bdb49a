//! Momentum: RSI (Wilder smoothing) and MACD
//!
//! RSI: the first averages are the simple mean of gains and losses over the
//! first `period` deltas; afterwards `avg = (avg * (period - 1) + current) / period`.
//! An average loss of exactly zero maps to 100.
//!
//! MACD is built on the first-value-seeded EMA (see `moving_average`).

use types::candle::{closes, ensure_finite, Candle};
use types::errors::AnalyticsError;
use types::indicator::{IndicatorPoint, MacdPoint};

use crate::ensure_period;
use crate::moving_average::ema_seeded_first;

/// Relative Strength Index.
///
/// Requires `len >= period + 1`. Output length is `len - period`, the first
/// point aligned to candle `period`.
pub fn rsi(candles: &[Candle], period: usize) -> Result<Vec<IndicatorPoint>, AnalyticsError> {
    ensure_period(period, "RSI")?;
    ensure_finite(candles)?;
    AnalyticsError::require_window(candles.len(), period, 1)?;

    let closes = closes(candles);
    let p = period as f64;

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss -= delta;
        }
    }
    avg_gain /= p;
    avg_loss /= p;

    let mut result = Vec::with_capacity(candles.len() - period);
    result.push(IndicatorPoint::new(
        candles[period].time,
        rsi_value(avg_gain, avg_loss),
    ));

    for i in (period + 1)..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        result.push(IndicatorPoint::new(
            candles[i].time,
            rsi_value(avg_gain, avg_loss),
        ));
    }

    Ok(result)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Moving Average Convergence Divergence.
///
/// The MACD line is valid from candle `slow - 1`; the signal line needs
/// `signal` valid MACD samples, so points start at candle
/// `slow + signal - 2`. Requires `len >= slow + signal`.
pub fn macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<Vec<MacdPoint>, AnalyticsError> {
    ensure_period(fast, "MACD fast")?;
    ensure_period(slow, "MACD slow")?;
    ensure_period(signal, "MACD signal")?;
    ensure_finite(candles)?;
    AnalyticsError::require_window(candles.len(), slow, signal)?;

    let closes = closes(candles);
    let fast_ema = ema_seeded_first(&closes, fast);
    let slow_ema = ema_seeded_first(&closes, slow);

    let start = slow - 1;
    let line: Vec<f64> = (start..closes.len())
        .map(|i| fast_ema[i] - slow_ema[i])
        .collect();
    let signal_line = ema_seeded_first(&line, signal);

    let result = ((signal - 1)..line.len())
        .map(|j| MacdPoint::new(candles[start + j].time, line[j], signal_line[j]))
        .collect();

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{candles_from_closes, falling, rising, wave};

    #[test]
    fn test_rsi_insufficient_data_boundary() {
        assert_eq!(
            rsi(&wave(14), 14),
            Err(AnalyticsError::InsufficientData {
                required: 15,
                actual: 14
            })
        );
        let result = rsi(&wave(15), 14).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_rsi_output_length_and_alignment() {
        let candles = wave(50);
        let result = rsi(&candles, 14).unwrap();
        assert_eq!(result.len(), 50 - 14);
        assert_eq!(result[0].time, candles[14].time);
    }

    #[test]
    fn test_rsi_rising_series_overbought() {
        let result = rsi(&rising(30), 14).unwrap();
        assert!(result.last().unwrap().value > 70.0);
    }

    #[test]
    fn test_rsi_falling_series_oversold() {
        let result = rsi(&falling(30), 14).unwrap();
        assert!(result.last().unwrap().value < 30.0);
    }

    #[test]
    fn test_rsi_zero_loss_is_100() {
        let result = rsi(&candles_from_closes(&[1.0; 20]), 14).unwrap();
        assert!(result.iter().all(|p| p.value == 100.0));
    }

    #[test]
    fn test_rsi_known_value() {
        // Deltas: +1, -1, +2 → avg gain 1.0, avg loss 1/3 → RS = 3 → RSI = 75
        let result = rsi(&candles_from_closes(&[10.0, 11.0, 10.0, 12.0]), 3).unwrap();
        assert!((result[0].value - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_bounded() {
        let result = rsi(&wave(200), 9).unwrap();
        assert!(result.iter().all(|p| (0.0..=100.0).contains(&p.value)));
    }

    #[test]
    fn test_macd_insufficient_data() {
        assert_eq!(
            macd(&wave(34), 12, 26, 9),
            Err(AnalyticsError::InsufficientData {
                required: 35,
                actual: 34
            })
        );
        let result = macd(&wave(35), 12, 26, 9).unwrap();
        assert_eq!(result.len(), 35 - 26 - 9 + 2);
    }

    #[test]
    fn test_huge_periods_are_rejected_not_overflowed() {
        assert!(matches!(rsi(&wave(50), usize::MAX), Err(AnalyticsError::InvalidInput(_))));
        assert!(matches!(
            macd(&wave(50), 12, usize::MAX, 9),
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(matches!(
            macd(&wave(50), 12, 26, usize::MAX),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_macd_histogram_identity() {
        let candles = wave(120);
        let result = macd(&candles, 12, 26, 9).unwrap();
        assert_eq!(result[0].time, candles[26 + 9 - 2].time);
        for point in &result {
            assert!((point.histogram - (point.macd - point.signal)).abs() < 1e-10);
        }
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let result = macd(&rising(60), 12, 26, 9).unwrap();
        assert!(result.last().unwrap().macd > 0.0);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let result = macd(&candles_from_closes(&[50.0; 40]), 12, 26, 9).unwrap();
        assert!(result
            .iter()
            .all(|p| p.macd.abs() < 1e-9 && p.signal.abs() < 1e-9));
    }
}
