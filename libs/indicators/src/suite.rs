//! Batch Suites: the indicator sets computed in one pass by the compute worker
//!
//! A suite fails as a whole on the first indicator error; callers never get
//! a partially filled suite.

use serde::{Deserialize, Serialize};
use types::candle::Candle;
use types::errors::AnalyticsError;
use types::indicator::{BollingerPoint, IndicatorPoint, MacdPoint};

use crate::momentum::{macd, rsi};
use crate::moving_average::ema;
use crate::volatility::{atr, bollinger};

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_MACD_FAST: usize = 12;
pub const DEFAULT_MACD_SLOW: usize = 26;
pub const DEFAULT_MACD_SIGNAL: usize = 9;
pub const DEFAULT_BB_PERIOD: usize = 20;
pub const DEFAULT_BB_STD_DEV: f64 = 2.0;
pub const DEFAULT_ATR_PERIOD: usize = 14;
pub const DEFAULT_EMA_PERIOD: usize = 20;

/// Periods for the full suite. Missing fields take the defaults above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuiteParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub atr_period: usize,
    pub ema_period: usize,
}

impl Default for SuiteParams {
    fn default() -> Self {
        Self {
            rsi_period: DEFAULT_RSI_PERIOD,
            macd_fast: DEFAULT_MACD_FAST,
            macd_slow: DEFAULT_MACD_SLOW,
            macd_signal: DEFAULT_MACD_SIGNAL,
            bb_period: DEFAULT_BB_PERIOD,
            bb_std_dev: DEFAULT_BB_STD_DEV,
            atr_period: DEFAULT_ATR_PERIOD,
            ema_period: DEFAULT_EMA_PERIOD,
        }
    }
}

/// Full indicator suite over one candle series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSuite {
    pub rsi: Vec<IndicatorPoint>,
    pub macd: Vec<MacdPoint>,
    pub bb: Vec<BollingerPoint>,
    pub atr: Vec<IndicatorPoint>,
    pub ema: Vec<IndicatorPoint>,
}

/// Reduced set computed per timeframe (RSI 14, MACD 12/26/9, EMA 20).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreIndicatorSet {
    pub rsi: Vec<IndicatorPoint>,
    pub macd: Vec<MacdPoint>,
    pub ema: Vec<IndicatorPoint>,
}

/// Compute RSI, MACD, Bollinger, ATR and EMA with the given periods.
pub fn compute_suite(candles: &[Candle], params: &SuiteParams) -> Result<IndicatorSuite, AnalyticsError> {
    Ok(IndicatorSuite {
        rsi: rsi(candles, params.rsi_period)?,
        macd: macd(candles, params.macd_fast, params.macd_slow, params.macd_signal)?,
        bb: bollinger(candles, params.bb_period, params.bb_std_dev)?,
        atr: atr(candles, params.atr_period)?,
        ema: ema(candles, params.ema_period)?,
    })
}

/// Compute the per-timeframe core set with fixed default periods.
pub fn compute_core_set(candles: &[Candle]) -> Result<CoreIndicatorSet, AnalyticsError> {
    Ok(CoreIndicatorSet {
        rsi: rsi(candles, DEFAULT_RSI_PERIOD)?,
        macd: macd(candles, DEFAULT_MACD_FAST, DEFAULT_MACD_SLOW, DEFAULT_MACD_SIGNAL)?,
        ema: ema(candles, DEFAULT_EMA_PERIOD)?,
    })
}
