//! Indicator output points
//!
//! Every indicator emits an ordered sequence aligned to a suffix of the
//! input candle timestamps. A point is never emitted for a candle whose
//! window is incomplete.

use serde::{Deserialize, Serialize};

/// Single-valued indicator output (RSI, EMA, SMA, ATR, VWAP).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: i64,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// MACD output. `histogram` is always `macd - signal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub time: i64,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdPoint {
    pub fn new(time: i64, macd: f64, signal: f64) -> Self {
        Self {
            time,
            macd,
            signal,
            histogram: macd - signal,
        }
    }
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerPoint {
    pub time: i64,
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerPoint {
    /// Band width relative to the middle band, 0 when the middle is 0.
    pub fn bandwidth(&self) -> f64 {
        if self.middle == 0.0 {
            0.0
        } else {
            (self.upper - self.lower) / self.middle
        }
    }
}

/// Last emitted value of a single-valued series.
pub fn last_value(points: &[IndicatorPoint]) -> Option<f64> {
    points.last().map(|p| p.value)
}
