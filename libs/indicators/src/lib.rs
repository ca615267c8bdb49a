//! Indicators: Deterministic Computation Layer
//!
//! Provides pure computation over candle and return series for:
//! - Moving averages (SMA, SMA-seeded EMA)
//! - Momentum (RSI with Wilder smoothing, MACD)
//! - Volatility (Bollinger Bands, ATR)
//! - Volume (cumulative VWAP)
//! - Pearson correlation and correlation matrices
//! - Mean-reversion statistics and tail risk (z-score, OU half-life, CVaR)
//! - Batch suites used by the compute worker
//!
//! # Determinism
//! All functions are pure: no system time, no RNG, no external calls.
//! Every function validates its input before computing and fails with a
//! typed [`AnalyticsError`](types::errors::AnalyticsError) instead of
//! emitting NaN or a partial series.

pub mod moving_average;
pub mod momentum;
pub mod volatility;
pub mod volume;
pub mod correlation;
pub mod statistics;
pub mod suite;

pub use correlation::{correlation, correlation_matrix};
pub use momentum::{macd, rsi};
pub use moving_average::{ema, sma};
pub use statistics::{analyze_mean_reversion, cvar, value_at_risk, MeanReversionAnalysis, MeanReversionSignal};
pub use suite::{compute_core_set, compute_suite, CoreIndicatorSet, IndicatorSuite, SuiteParams};
pub use volatility::{atr, bollinger};
pub use volume::vwap;

use types::candle::Candle;
use types::errors::AnalyticsError;
use types::indicator::IndicatorPoint;

/// Crate version constant
pub const INDICATORS_VERSION: &str = "1.0.0";

/// Reject a zero period; every windowed indicator divides by it.
pub(crate) fn ensure_period(period: usize, name: &str) -> Result<(), AnalyticsError> {
    if period == 0 {
        return Err(AnalyticsError::InvalidInput(format!(
            "{} period must be positive",
            name
        )));
    }
    Ok(())
}

/// Pair computed values with the candles they belong to, starting at `offset`.
pub(crate) fn align(candles: &[Candle], offset: usize, values: Vec<f64>) -> Vec<IndicatorPoint> {
    candles[offset..]
        .iter()
        .zip(values)
        .map(|(candle, value)| IndicatorPoint::new(candle.time, value))
        .collect()
}
