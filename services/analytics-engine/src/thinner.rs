//! Throttled candle thinning
//!
//! High-frequency candle updates are buffered and merged into one candle per
//! throttle interval. Emission is checked on every `process` call and on an
//! explicit `flush`; there is no background timer.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::candle::Candle;

use crate::now_millis;

/// Configuration for the thinner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinnerConfig {
    /// Minimum interval between two emissions, in milliseconds.
    pub throttle_ms: i64,
}

impl Default for ThinnerConfig {
    fn default() -> Self {
        Self { throttle_ms: 100 }
    }
}

/// Buffers candles and emits one merged candle per throttle interval.
#[derive(Debug, Clone)]
pub struct DataThinner {
    config: ThinnerConfig,
    buffer: Vec<Candle>,
    last_emit: Option<i64>,
    emitted: u64,
}

impl DataThinner {
    pub fn new(config: ThinnerConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            last_emit: None,
            emitted: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ThinnerConfig::default())
    }

    /// Buffer a candle received now.
    pub fn process(&mut self, candle: Candle) -> Option<Candle> {
        self.process_at(candle, now_millis())
    }

    /// Buffer a candle received at `now` (Unix ms) and flush when the throttle
    /// interval has elapsed since the last emission.
    pub fn process_at(&mut self, candle: Candle, now: i64) -> Option<Candle> {
        if candle.is_finite() {
            self.buffer.push(candle);
        } else {
            warn!(time = candle.time, "Skipping non-finite candle");
        }

        let due = self
            .last_emit
            .map_or(true, |last| now - last >= self.config.throttle_ms);
        if due {
            self.flush_at(now)
        } else {
            None
        }
    }

    /// Merge and emit whatever is buffered, using the wall clock.
    pub fn flush(&mut self) -> Option<Candle> {
        self.flush_at(now_millis())
    }

    /// Merge the buffer into one candle and record `now` as the emission time.
    ///
    /// The merged candle takes the first candle's time and open, the extreme
    /// high and low, the last close and the summed volume. An empty buffer
    /// emits nothing.
    pub fn flush_at(&mut self, now: i64) -> Option<Candle> {
        let merged = merge(&self.buffer)?;
        debug!(
            merged = self.buffer.len(),
            time = merged.time,
            close = merged.close,
            "Thinner flushed"
        );
        self.buffer.clear();
        self.last_emit = Some(now);
        self.emitted += 1;
        Some(merged)
    }

    /// Number of candles waiting to be merged.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total merged candles emitted.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_emit = None;
    }
}

fn merge(candles: &[Candle]) -> Option<Candle> {
    let first = candles.first()?;
    let last = candles.last()?;
    let mut merged = Candle::new(first.time, first.open, first.high, first.low, last.close, 0.0);
    for candle in candles {
        merged.high = merged.high.max(candle.high);
        merged.low = merged.low.min(candle.low);
        merged.volume += candle.volume;
    }
    Some(merged)
}
