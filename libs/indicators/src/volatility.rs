//! Volatility: Bollinger Bands and Average True Range

use types::candle::{closes, ensure_finite, Candle};
use types::errors::AnalyticsError;
use types::indicator::{BollingerPoint, IndicatorPoint};

use crate::ensure_period;

/// Bollinger Bands: SMA middle band ± `k` population standard deviations.
///
/// The deviation divides by `period`, not `period - 1`. A window whose
/// closes are all equal has zero deviation, so all three bands coincide;
/// otherwise the bands are strictly ordered, which needs `k > 0`.
pub fn bollinger(
    candles: &[Candle],
    period: usize,
    k: f64,
) -> Result<Vec<BollingerPoint>, AnalyticsError> {
    ensure_period(period, "Bollinger")?;
    if !k.is_finite() || k <= 0.0 {
        return Err(AnalyticsError::InvalidInput(format!(
            "Bollinger multiplier must be finite and positive, got {}",
            k
        )));
    }
    ensure_finite(candles)?;
    AnalyticsError::require_len(candles.len(), period)?;

    let closes = closes(candles);
    let p = period as f64;

    let result = closes
        .windows(period)
        .enumerate()
        .map(|(i, window)| {
            let middle = window.iter().sum::<f64>() / p;
            let std_dev = if window.iter().all(|&c| c == window[0]) {
                0.0
            } else {
                let variance = window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / p;
                variance.sqrt()
            };
            BollingerPoint {
                time: candles[i + period - 1].time,
                upper: middle + k * std_dev,
                middle,
                lower: middle - k * std_dev,
            }
        })
        .collect();

    Ok(result)
}

/// True range of a candle against the previous close.
pub fn true_range(candle: &Candle, prev_close: f64) -> f64 {
    (candle.high - candle.low)
        .max((candle.high - prev_close).abs())
        .max((candle.low - prev_close).abs())
}

/// Average True Range with Wilder smoothing.
///
/// True range needs a previous close, so the first ATR (simple mean of the
/// first `period` true ranges) lands on candle `period`.
/// Requires `len >= period + 1`; output length is `len - period`.
pub fn atr(candles: &[Candle], period: usize) -> Result<Vec<IndicatorPoint>, AnalyticsError> {
    ensure_period(period, "ATR")?;
    ensure_finite(candles)?;
    AnalyticsError::require_window(candles.len(), period, 1)?;

    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|pair| true_range(&pair[1], pair[0].close))
        .collect();

    let p = period as f64;
    let mut value = ranges[..period].iter().sum::<f64>() / p;

    let mut result = Vec::with_capacity(candles.len() - period);
    result.push(IndicatorPoint::new(candles[period].time, value));

    for (i, tr) in ranges.iter().enumerate().skip(period) {
        value = (value * (p - 1.0) + tr) / p;
        // ranges[i] belongs to candle i + 1
        result.push(IndicatorPoint::new(candles[i + 1].time, value));
    }

    Ok(result)
}
