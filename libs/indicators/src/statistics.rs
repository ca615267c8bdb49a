//! Mean-Reversion Statistics and Tail Risk
//!
//! Operates on return series. Every value exposed to callers is finite:
//! intermediate NaN or infinity (zero variance, zero autocorrelation
//! denominators) is replaced with 0 before it leaves this module.

use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};
use types::candle::ensure_finite_values;
use types::errors::AnalyticsError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum returns required for a mean-reversion analysis.
pub const MIN_MEAN_REVERSION_POINTS: usize = 20;

/// Half-life cap, in periods.
pub const MAX_HALF_LIFE: f64 = 100.0;

const STRONG_THRESHOLD: f64 = 2.5;
const THRESHOLD: f64 = 1.5;

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`), 0 for an empty slice.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Simple returns `p_t / p_{t-1} - 1`. A zero previous price yields 0.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| finite_or_zero(w[1] / w[0] - 1.0))
        .collect()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Mean reversion
// ---------------------------------------------------------------------------

/// Trading signal derived from the z-score of the latest return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeanReversionSignal {
    /// z < -2.5
    StrongBuy,
    /// -2.5 <= z < -1.5
    Buy,
    Neutral,
    /// 1.5 < z <= 2.5
    Sell,
    /// z > 2.5
    StrongSell,
    /// Fewer than [`MIN_MEAN_REVERSION_POINTS`] returns.
    InsufficientData,
}

impl MeanReversionSignal {
    pub fn from_z_score(z: f64) -> Self {
        if z > STRONG_THRESHOLD {
            MeanReversionSignal::StrongSell
        } else if z > THRESHOLD {
            MeanReversionSignal::Sell
        } else if z < -STRONG_THRESHOLD {
            MeanReversionSignal::StrongBuy
        } else if z < -THRESHOLD {
            MeanReversionSignal::Buy
        } else {
            MeanReversionSignal::Neutral
        }
    }
}

/// Mean-reversion metrics over a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeanReversionAnalysis {
    pub mean: f64,
    pub std_dev: f64,
    /// z-score of the most recent return.
    pub z_score: f64,
    /// First-order autocorrelation `Σ(r[t-1]·r[t]) / Σ(r[t-1]²)`.
    pub autocorrelation: f64,
    /// OU speed `-ln(autocorrelation)`, clamped to 0 when not positive.
    pub theta: f64,
    /// `ln 2 / theta`, capped at [`MAX_HALF_LIFE`].
    pub half_life: f64,
    /// `clamp(1 - |autocorrelation|, 0, 1)`.
    pub strength: f64,
    pub signal: MeanReversionSignal,
}

impl MeanReversionAnalysis {
    /// Sentinel returned for short series: every metric zeroed.
    pub fn insufficient_data() -> Self {
        Self {
            mean: 0.0,
            std_dev: 0.0,
            z_score: 0.0,
            autocorrelation: 0.0,
            theta: 0.0,
            half_life: 0.0,
            strength: 0.0,
            signal: MeanReversionSignal::InsufficientData,
        }
    }
}

/// Analyze a return series for mean-reversion.
///
/// Short series (fewer than 20 returns) yield the
/// [`insufficient_data`](MeanReversionAnalysis::insufficient_data) sentinel,
/// not an error. Non-finite returns are rejected.
pub fn analyze_mean_reversion(returns: &[f64]) -> Result<MeanReversionAnalysis, AnalyticsError> {
    ensure_finite_values(returns)?;
    if returns.len() < MIN_MEAN_REVERSION_POINTS {
        return Ok(MeanReversionAnalysis::insufficient_data());
    }

    let mean = finite_or_zero(mean(returns));
    let std_dev = finite_or_zero(population_std_dev(returns));

    let last = returns[returns.len() - 1];
    let z_score = finite_or_zero((last - mean) / std_dev);

    let (num, den) = returns
        .windows(2)
        .fold((0.0, 0.0), |(num, den), w| (num + w[0] * w[1], den + w[0] * w[0]));
    let autocorrelation = finite_or_zero(num / den);

    let theta = {
        let raw = finite_or_zero(-autocorrelation.ln());
        if raw > 0.0 {
            raw
        } else {
            0.0
        }
    };
    let half_life = if theta > 0.0 {
        finite_or_zero((LN_2 / theta).min(MAX_HALF_LIFE))
    } else {
        MAX_HALF_LIFE
    };
    let strength = (1.0 - autocorrelation.abs()).clamp(0.0, 1.0);

    Ok(MeanReversionAnalysis {
        mean,
        std_dev,
        z_score,
        autocorrelation,
        theta,
        half_life,
        strength,
        signal: MeanReversionSignal::from_z_score(z_score),
    })
}

// ---------------------------------------------------------------------------
// Tail risk
// ---------------------------------------------------------------------------

fn sorted_tail(returns: &[f64], confidence: f64) -> Result<(Vec<f64>, usize), AnalyticsError> {
    ensure_finite_values(returns)?;
    AnalyticsError::require_len(returns.len(), 1)?;
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(AnalyticsError::InvalidInput(format!(
            "confidence must be in (0, 1), got {}",
            confidence
        )));
    }

    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((1.0 - confidence) * sorted.len() as f64).floor() as usize;
    Ok((sorted, idx))
}

/// Conditional Value at Risk (expected shortfall), as a positive loss.
///
/// `idx = floor((1 - confidence) · n)`; when `idx == 0` the worst single
/// return is used, otherwise the mean of the `idx` worst returns.
pub fn cvar(returns: &[f64], confidence: f64) -> Result<f64, AnalyticsError> {
    let (sorted, idx) = sorted_tail(returns, confidence)?;
    if idx == 0 {
        return Ok(-sorted[0]);
    }
    let tail = &sorted[..idx];
    Ok(-(tail.iter().sum::<f64>() / idx as f64))
}

/// Historical Value at Risk: the loss at the tail index, as a positive number.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Result<f64, AnalyticsError> {
    let (sorted, idx) = sorted_tail(returns, confidence)?;
    Ok(-sorted[idx.min(sorted.len() - 1)])
}
