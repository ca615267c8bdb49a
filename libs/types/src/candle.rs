//! OHLCV candle
//!
//! The unit of input for every indicator. Candles are plain `f64` values:
//! indicator math is floating point, and exactness is defined against the
//! published formulas rather than decimal bookkeeping.

use serde::{Deserialize, Serialize};

use crate::errors::AnalyticsError;

/// A single OHLCV candle. `time` is Unix seconds at the candle open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat candle where every price equals `price`.
    pub fn flat(time: i64, price: f64, volume: f64) -> Self {
        Self::new(time, price, price, price, price, volume)
    }

    /// Typical price `(high + low + close) / 3`, the VWAP weight basis.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Whether every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// Validate candle integrity (OHLCV invariants).
    pub fn is_valid(&self) -> bool {
        self.is_finite()
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.high >= self.low
            && self.volume >= 0.0
    }
}

/// Reject a series containing any non-finite field.
///
/// Reports the offending index so a caller can locate the bad tick.
pub fn ensure_finite(candles: &[Candle]) -> Result<(), AnalyticsError> {
    match candles.iter().position(|c| !c.is_finite()) {
        Some(idx) => Err(AnalyticsError::InvalidInput(format!(
            "non-finite value in candle {} (time {})",
            idx, candles[idx].time
        ))),
        None => Ok(()),
    }
}

/// Reject a numeric series containing NaN or infinity.
pub fn ensure_finite_values(values: &[f64]) -> Result<(), AnalyticsError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(AnalyticsError::InvalidInput(format!(
            "non-finite value at index {}",
            idx
        ))),
        None => Ok(()),
    }
}

/// Close prices of a candle series, in order.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
