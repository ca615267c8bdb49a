//! Order-book snapshots
//!
//! A snapshot is an immutable view of aggregated depth at one instant.
//! Price levels are keyed by exact `Decimal` so that the same level in two
//! consecutive snapshots compares equal, and stored in an `IndexMap` so
//! iteration follows the order the feed delivered the levels in.
//!
//! A price absent from a side means zero size at that price.

use indexmap::IndexMap;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::Symbol;

/// Price → size mapping for one side of the book.
pub type BookSide = IndexMap<Decimal, f64>;

/// Full-depth snapshot for a single symbol. `timestamp` is Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    pub timestamp: i64,
    pub bids: BookSide,
    pub asks: BookSide,
}

impl OrderBookSnapshot {
    /// Create an empty snapshot.
    pub fn new(symbol: impl Into<Symbol>, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            bids: IndexMap::new(),
            asks: IndexMap::new(),
        }
    }

    /// Build a snapshot from raw `(price, size)` pairs.
    ///
    /// Levels whose price cannot be represented (NaN, infinite) are skipped
    /// rather than rejected; a single bad level must not drop the snapshot.
    pub fn from_levels(
        symbol: impl Into<Symbol>,
        timestamp: i64,
        bids: &[(f64, f64)],
        asks: &[(f64, f64)],
    ) -> Self {
        let mut snapshot = Self::new(symbol, timestamp);
        for &(price, size) in bids {
            snapshot.set_bid(price, size);
        }
        for &(price, size) in asks {
            snapshot.set_ask(price, size);
        }
        snapshot
    }

    /// Set the bid size at a price level. Returns false if the price was skipped.
    pub fn set_bid(&mut self, price: f64, size: f64) -> bool {
        match Decimal::from_f64(price) {
            Some(p) => {
                self.bids.insert(p, size);
                true
            }
            None => false,
        }
    }

    /// Set the ask size at a price level. Returns false if the price was skipped.
    pub fn set_ask(&mut self, price: f64, size: f64) -> bool {
        match Decimal::from_f64(price) {
            Some(p) => {
                self.asks.insert(p, size);
                true
            }
            None => false,
        }
    }

    /// Builder-style variant of [`set_bid`](Self::set_bid).
    pub fn with_bid(mut self, price: f64, size: f64) -> Self {
        self.set_bid(price, size);
        self
    }

    /// Builder-style variant of [`set_ask`](Self::set_ask).
    pub fn with_ask(mut self, price: f64, size: f64) -> Self {
        self.set_ask(price, size);
        self
    }

    /// Bid size at a price, zero when absent.
    pub fn bid_size(&self, price: &Decimal) -> f64 {
        self.bids.get(price).copied().unwrap_or(0.0)
    }

    /// Ask size at a price, zero when absent.
    pub fn ask_size(&self, price: &Decimal) -> f64 {
        self.asks.get(price).copied().unwrap_or(0.0)
    }

    /// Highest bid price with positive size.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids
            .iter()
            .filter(|(_, size)| **size > 0.0)
            .map(|(price, _)| *price)
            .max()
    }

    /// Lowest ask price with positive size.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks
            .iter()
            .filter(|(_, size)| **size > 0.0)
            .map(|(price, _)| *price)
            .min()
    }

    /// Mid price, if both sides have liquidity.
    pub fn mid_price(&self) -> Option<f64> {
        let bid = self.best_bid()?.to_f64()?;
        let ask = self.best_ask()?.to_f64()?;
        Some((bid + ask) / 2.0)
    }

    /// Whether both sides are empty.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
