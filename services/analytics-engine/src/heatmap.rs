//! Time-price liquidity heatmap
//!
//! Order-book snapshots are kept in a bounded FIFO buffer and binned into a
//! grid of `(time bin, price bin)` cells holding the summed bid and ask size.
//! Price binning runs in `Decimal` so that a level sitting exactly on a bin
//! edge lands in that bin regardless of its binary float representation.

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::book::{BookSide, OrderBookSnapshot};
use types::errors::AnalyticsError;

use crate::now_millis;

/// Default number of snapshots kept by [`SnapshotBuffer`].
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 600;

/// Binning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub time_bin_seconds: f64,
    pub price_bin_size: f64,
    pub time_window_minutes: f64,
    /// Only the first N levels of each side (in feed order) are binned.
    pub max_price_levels: Option<usize>,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            time_bin_seconds: 5.0,
            price_bin_size: 1.0,
            time_window_minutes: 15.0,
            max_price_levels: None,
        }
    }
}

impl HeatmapConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let positive = [
            ("time_bin_seconds", self.time_bin_seconds),
            ("price_bin_size", self.price_bin_size),
            ("time_window_minutes", self.time_window_minutes),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalyticsError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.max_price_levels == Some(0) {
            return Err(AnalyticsError::InvalidConfig(
                "max_price_levels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summed liquidity in one `(time, price)` bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    /// Bin start, Unix ms.
    pub time: i64,
    /// Bin floor price.
    pub price: f64,
    pub bid_size: f64,
    pub ask_size: f64,
    pub total_size: f64,
}

/// Binned grid plus the ranges a renderer needs for scaling.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapData {
    /// Sorted by time, then price.
    pub cells: Vec<HeatmapCell>,
    pub time_range: Option<(i64, i64)>,
    pub price_range: Option<(f64, f64)>,
    pub max_bid_size: f64,
    pub max_ask_size: f64,
    pub max_total_size: f64,
}

impl HeatmapData {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Default)]
struct CellSizes {
    bid: f64,
    ask: f64,
}

/// Bin `snapshots` taken within the window ending at `now` (Unix ms).
pub fn aggregate<'a, I>(snapshots: I, config: &HeatmapConfig, now: i64) -> Result<HeatmapData, AnalyticsError>
where
    I: IntoIterator<Item = &'a OrderBookSnapshot>,
{
    config.validate()?;

    let time_bin_ms = config.time_bin_seconds * 1_000.0;
    let cutoff = now - (config.time_window_minutes * 60_000.0) as i64;
    let price_bin = Decimal::from_f64(config.price_bin_size)
        .filter(|bin| !bin.is_zero())
        .ok_or_else(|| {
            AnalyticsError::InvalidConfig(format!(
                "price_bin_size {} is not representable",
                config.price_bin_size
            ))
        })?;
    let levels = config.max_price_levels.unwrap_or(usize::MAX);

    let mut grid: BTreeMap<(i64, Decimal), CellSizes> = BTreeMap::new();
    let mut used = 0usize;

    for snapshot in snapshots {
        if snapshot.timestamp < cutoff {
            continue;
        }
        used += 1;
        let time = ((snapshot.timestamp as f64 / time_bin_ms).floor() * time_bin_ms) as i64;

        for (price, size) in binned_levels(&snapshot.bids, price_bin, levels) {
            grid.entry((time, price)).or_default().bid += size;
        }
        for (price, size) in binned_levels(&snapshot.asks, price_bin, levels) {
            grid.entry((time, price)).or_default().ask += size;
        }
    }

    let mut data = HeatmapData::default();
    for ((time, price), sizes) in grid {
        let price = price.to_f64().unwrap_or_default();
        let total = sizes.bid + sizes.ask;

        data.time_range = Some(match data.time_range {
            None => (time, time),
            Some((lo, hi)) => (lo.min(time), hi.max(time)),
        });
        data.price_range = Some(match data.price_range {
            None => (price, price),
            Some((lo, hi)) => (lo.min(price), hi.max(price)),
        });
        data.max_bid_size = data.max_bid_size.max(sizes.bid);
        data.max_ask_size = data.max_ask_size.max(sizes.ask);
        data.max_total_size = data.max_total_size.max(total);

        data.cells.push(HeatmapCell {
            time,
            price,
            bid_size: sizes.bid,
            ask_size: sizes.ask,
            total_size: total,
        });
    }

    debug!(snapshots = used, cells = data.cells.len(), "Heatmap aggregated");
    Ok(data)
}

/// First `levels` entries of a side, floored to the price bin. Levels with a
/// non-positive price or a non-positive/non-finite size are skipped.
fn binned_levels(side: &BookSide, bin: Decimal, levels: usize) -> impl Iterator<Item = (Decimal, f64)> + '_ {
    side.iter()
        .take(levels)
        .filter(|(price, size)| price.is_sign_positive() && !price.is_zero() && size.is_finite() && **size > 0.0)
        .filter_map(move |(price, size)| {
            let index = price.checked_div(bin)?.floor();
            Some((index.checked_mul(bin)?.normalize(), *size))
        })
}

/// Bounded FIFO of recent snapshots feeding the heatmap.
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    snapshots: VecDeque<OrderBookSnapshot>,
    capacity: usize,
}

impl SnapshotBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SNAPSHOT_CAPACITY)
    }

    /// Append a snapshot, evicting the oldest once full.
    pub fn push(&mut self, snapshot: OrderBookSnapshot) {
        if self.capacity == 0 {
            return;
        }
        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn latest(&self) -> Option<&OrderBookSnapshot> {
        self.snapshots.back()
    }

    /// Snapshots oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &OrderBookSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Heatmap over the buffered snapshots, windowed against the wall clock.
    pub fn heatmap(&self, config: &HeatmapConfig) -> Result<HeatmapData, AnalyticsError> {
        self.heatmap_at(config, now_millis())
    }

    pub fn heatmap_at(&self, config: &HeatmapConfig, now: i64) -> Result<HeatmapData, AnalyticsError> {
        aggregate(self.snapshots.iter(), config, now)
    }
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::with_defaults()
    }
}
