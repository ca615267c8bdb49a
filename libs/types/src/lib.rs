//! Types library for the market analytics engine
//!
//! This library provides the core data model shared by the indicator library
//! and the analytics engine, so that every stage agrees on the shape of a
//! candle, an order-book snapshot, and an indicator output.
//!
//! # Version
//! v1.0.0
//!
//! # Modules
//! - `ids`: Identifiers (AlertId, Symbol)
//! - `candle`: OHLCV candle and series validation
//! - `book`: Order-book snapshots keyed by exact decimal price
//! - `indicator`: Indicator output points (single and multi-field)
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod candle;
pub mod book;
pub mod indicator;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::candle::*;
    pub use crate::book::*;
    pub use crate::indicator::*;
    pub use crate::errors::*;
}
