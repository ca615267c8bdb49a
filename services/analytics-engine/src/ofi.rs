//! Order-Flow Imbalance
//!
//! Measures buy versus sell pressure from the change in resting size between
//! two consecutive book snapshots of one symbol:
//!
//! - bid pressure: size added on the bid side, `Σ max(cur − prev, 0)`
//! - ask pressure: size removed from the ask side, `Σ max(prev − cur, 0)`
//! - `ofi = (bid − ask) / (|bid| + |ask|)`, zero when nothing changed
//!
//! A price present in only one snapshot counts as zero size in the other.
//! Each engine keeps a bounded FIFO history of results for rolling
//! statistics and significant-event detection.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::book::{BookSide, OrderBookSnapshot};
use types::ids::Symbol;

use crate::registry::SymbolRegistry;

/// Configuration for an OFI engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfiConfig {
    /// Maximum number of results kept for rolling statistics.
    pub history_capacity: usize,
    /// |z| above this marks a significant event.
    pub z_score_threshold: f64,
}

impl Default for OfiConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            z_score_threshold: 2.0,
        }
    }
}

/// One OFI measurement between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfiResult {
    pub timestamp: i64,
    pub symbol: Symbol,
    pub bid_pressure: f64,
    pub ask_pressure: f64,
    pub ofi: f64,
    /// Same value as `ofi`, kept for consumers that read the ratio name.
    pub imbalance_ratio: f64,
}

/// Direction of a significant imbalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfiDirection {
    Buy,
    Sell,
}

/// Latest OFI value far outside its recent distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfiEvent {
    pub timestamp: i64,
    pub symbol: Symbol,
    pub direction: OfiDirection,
    /// |z| of the latest value.
    pub magnitude: f64,
    pub ofi: f64,
}

/// Registry of OFI engines keyed by symbol.
pub type OfiRegistry = SymbolRegistry<OfiEngine>;

/// Per-symbol OFI engine.
#[derive(Debug, Clone)]
pub struct OfiEngine {
    symbol: Symbol,
    config: OfiConfig,
    previous: Option<OrderBookSnapshot>,
    history: VecDeque<OfiResult>,
}

impl OfiEngine {
    pub fn new(symbol: impl Into<Symbol>, config: OfiConfig) -> Self {
        let symbol = symbol.into();
        info!(
            symbol = %symbol,
            history_capacity = config.history_capacity,
            z_score_threshold = config.z_score_threshold,
            "OfiEngine initialized"
        );
        Self {
            symbol,
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            previous: None,
        }
    }

    pub fn with_defaults(symbol: impl Into<Symbol>) -> Self {
        Self::new(symbol, OfiConfig::default())
    }

    /// Registry that builds engines with a shared configuration.
    pub fn registry(config: OfiConfig) -> OfiRegistry {
        SymbolRegistry::new(move |symbol: &Symbol| OfiEngine::new(symbol.clone(), config.clone()))
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Compare `snapshot` with the previous one.
    ///
    /// The first call only stores the baseline and returns `None`.
    pub fn calculate(&mut self, snapshot: &OrderBookSnapshot) -> Option<OfiResult> {
        let Some(previous) = self.previous.replace(snapshot.clone()) else {
            debug!(symbol = %self.symbol, timestamp = snapshot.timestamp, "OFI baseline stored");
            return None;
        };

        let bid_pressure = added_size(&previous.bids, &snapshot.bids);
        let ask_pressure = added_size(&snapshot.asks, &previous.asks);

        let denominator = bid_pressure.abs() + ask_pressure.abs();
        let ofi = if denominator > 0.0 {
            (bid_pressure - ask_pressure) / denominator
        } else {
            0.0
        };

        let result = OfiResult {
            timestamp: snapshot.timestamp,
            symbol: self.symbol.clone(),
            bid_pressure,
            ask_pressure,
            ofi,
            imbalance_ratio: ofi,
        };

        if self.config.history_capacity > 0 {
            if self.history.len() >= self.config.history_capacity {
                self.history.pop_front();
            }
            self.history.push_back(result.clone());
        }

        debug!(
            symbol = %self.symbol,
            timestamp = result.timestamp,
            bid_pressure,
            ask_pressure,
            ofi,
            "OFI computed"
        );

        Some(result)
    }

    /// Mean OFI over the last `window` results.
    pub fn moving_average(&self, window: usize) -> Option<f64> {
        let values = self.recent(window);
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Population standard deviation of OFI over the last `window` results.
    pub fn std_dev(&self, window: usize) -> Option<f64> {
        let values = self.recent(window);
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(variance.sqrt())
    }

    /// Z-score of the latest OFI against the whole history.
    ///
    /// `None` with fewer than two results or zero dispersion.
    pub fn z_score(&self) -> Option<f64> {
        if self.history.len() < 2 {
            return None;
        }
        let latest = self.history.back()?.ofi;
        let mean = self.moving_average(self.history.len())?;
        let std = self.std_dev(self.history.len())?;
        if std == 0.0 || !std.is_finite() {
            return None;
        }
        Some((latest - mean) / std)
    }

    /// Latest result as an event when its |z| exceeds the threshold.
    pub fn significant_event(&self) -> Option<OfiEvent> {
        let z = self.z_score()?;
        if z.abs() <= self.config.z_score_threshold {
            return None;
        }
        let latest = self.history.back()?;
        let direction = if z > 0.0 { OfiDirection::Buy } else { OfiDirection::Sell };
        info!(
            symbol = %self.symbol,
            z_score = z,
            direction = ?direction,
            "Significant order-flow imbalance"
        );
        Some(OfiEvent {
            timestamp: latest.timestamp,
            symbol: self.symbol.clone(),
            direction,
            magnitude: z.abs(),
            ofi: latest.ofi,
        })
    }

    pub fn latest(&self) -> Option<&OfiResult> {
        self.history.back()
    }

    /// Results oldest first.
    pub fn history(&self) -> impl Iterator<Item = &OfiResult> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Forget the baseline and the history.
    pub fn reset(&mut self) {
        self.previous = None;
        self.history.clear();
    }

    fn recent(&self, window: usize) -> Vec<f64> {
        let skip = self.history.len().saturating_sub(window);
        self.history.iter().skip(skip).map(|r| r.ofi).collect()
    }
}

/// Size that `to` holds above `from`, summed over every price in `to`.
///
/// Prices only in `from` contribute `0 − size`, which is never positive, so
/// iterating `to` covers the union.
fn added_size(from: &BookSide, to: &BookSide) -> f64 {
    to.iter()
        .map(|(price, &size)| {
            let before = from.get(price).copied().map_or(0.0, sanitize);
            (sanitize(size) - before).max(0.0)
        })
        .sum()
}

/// Non-finite or negative sizes count as an empty level.
fn sanitize(size: f64) -> f64 {
    if size.is_finite() && size > 0.0 {
        size
    } else {
        0.0
    }
}
