//! Volume: cumulative whole-series VWAP
//!
//! VWAP = Σ(typical_price × volume) / Σ(volume), accumulated from the first
//! candle of the series (not a rolling window).

use types::candle::{ensure_finite, Candle};
use types::errors::AnalyticsError;
use types::indicator::IndicatorPoint;

/// Cumulative VWAP, one point per candle.
///
/// While cumulative volume is zero the point falls back to the candle close.
pub fn vwap(candles: &[Candle]) -> Result<Vec<IndicatorPoint>, AnalyticsError> {
    ensure_finite(candles)?;
    AnalyticsError::require_len(candles.len(), 1)?;

    let mut sum_pv = 0.0;
    let mut sum_v = 0.0;

    let result = candles
        .iter()
        .map(|candle| {
            sum_pv += candle.typical_price() * candle.volume;
            sum_v += candle.volume;
            let value = if sum_v > 0.0 {
                sum_pv / sum_v
            } else {
                candle.close
            };
            IndicatorPoint::new(candle.time, value)
        })
        .collect();

    Ok(result)
}
