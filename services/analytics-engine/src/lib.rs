//! Analytics Engine
//!
//! Stateful streaming engines and the boundaries around them:
//! - Order-flow imbalance per symbol with rolling z-score events
//! - Feed provenance (sequence, latency percentiles, gap and staleness detection)
//! - Throttled candle thinning and time-price heatmap binning
//! - Rule-based alerts with cooldown scheduling, notifier seam and persistence
//! - The compute worker boundary (JSON protocol, worker thread, async client)
//!
//! # Architecture
//!
//! ```text
//!  ticks / candles / book snapshots
//!        │
//!   ┌────▼──────┐
//!   │Provenance │  ← sequence, latency, gaps, feed status
//!   └────┬──────┘
//!        │
//!   ┌────┴───────┬──────────────┐
//!   │            │              │
//! ┌─▼──────┐ ┌───▼────┐  ┌──────▼───────┐
//! │Thinner │ │  OFI   │  │SnapshotBuffer│
//! └─┬──────┘ └───┬────┘  └──────┬───────┘
//!   │            │              │
//! ┌─▼──────────┐ │        ┌─────▼──┐
//! │ComputeWorker│ │        │Heatmap │
//! └─┬──────────┘ │        └────────┘
//!   │            │
//! ┌─▼────────────▼─┐
//! │  Alert Engine  │
//! └────────────────┘
//! ```
//!
//! Every time-dependent operation has an `_at` variant taking an explicit
//! millisecond timestamp; the plain variant reads the wall clock.

pub mod alerts;
pub mod config;
pub mod heatmap;
pub mod metrics;
pub mod ofi;
pub mod provenance;
pub mod registry;
pub mod thinner;
pub mod worker;

pub use config::{AnalyticsConfig, ConfigError};
pub use registry::SymbolRegistry;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
