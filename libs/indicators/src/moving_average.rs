//! Moving Averages: SMA and EMA over candle closes
//!
//! Two EMA variants live here on purpose:
//! - [`ema`] / [`ema_values`]: seeded with the SMA of the first `period`
//!   values, emitted from index `period - 1`.
//! - [`ema_seeded_first`]: seeded with the first raw value and emitted for
//!   every index. MACD is defined on this one.

use types::candle::{closes, ensure_finite, Candle};
use types::errors::AnalyticsError;
use types::indicator::IndicatorPoint;

use crate::{align, ensure_period};

// ---------------------------------------------------------------------------
// Public candle-series API
// ---------------------------------------------------------------------------

/// Simple moving average of closes.
///
/// Output length is `len - period + 1`, aligned to candles `period - 1..`.
pub fn sma(candles: &[Candle], period: usize) -> Result<Vec<IndicatorPoint>, AnalyticsError> {
    ensure_period(period, "SMA")?;
    ensure_finite(candles)?;
    AnalyticsError::require_len(candles.len(), period)?;

    let values = sma_values(&closes(candles), period);
    Ok(align(candles, period - 1, values))
}

/// Exponential moving average of closes, seeded with the SMA of the first window.
///
/// `k = 2 / (period + 1)`; output length is `len - period + 1`.
pub fn ema(candles: &[Candle], period: usize) -> Result<Vec<IndicatorPoint>, AnalyticsError> {
    ensure_period(period, "EMA")?;
    ensure_finite(candles)?;
    AnalyticsError::require_len(candles.len(), period)?;

    let values = ema_values(&closes(candles), period);
    Ok(align(candles, period - 1, values))
}

// ---------------------------------------------------------------------------
// Raw value helpers
// ---------------------------------------------------------------------------

/// Smoothing factor shared by both EMA variants.
pub fn ema_multiplier(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Sliding-window mean. Each window is summed independently so the result
/// does not accumulate drift from a running sum.
///
/// Caller guarantees `period > 0`; returns empty when `values.len() < period`.
pub fn sma_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// SMA-seeded EMA. Returns empty when `values.len() < period`.
pub fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = ema_multiplier(period);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(seed);

    let mut prev = seed;
    for &value in &values[period..] {
        prev = value * k + prev * (1.0 - k);
        result.push(prev);
    }
    result
}

/// EMA seeded with the first raw value, one output per input.
pub fn ema_seeded_first(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let k = ema_multiplier(period);
    let mut result = Vec::with_capacity(values.len());
    result.push(first);

    let mut prev = first;
    for &value in &values[1..] {
        prev = value * k + prev * (1.0 - k);
        result.push(prev);
    }
    result
}
