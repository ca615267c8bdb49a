//! Feed Provenance
//!
//! Wraps every inbound tick of one symbol with a provenance record: a local
//! sequence number, receipt time, exchange-to-receipt latency, a suspected
//! gap flag and the feed status at receipt. The engine also answers
//! feed-health queries (status, quality score, latency percentiles) which are
//! recomputed against the query time, so a feed turns STALE without any new
//! tick arriving.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::ids::Symbol;

use crate::metrics::LatencyTracker;
use crate::now_millis;
use crate::registry::SymbolRegistry;

/// Configuration for a provenance engine. All durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceConfig {
    /// Silence longer than this marks the feed STALE.
    pub stale_threshold_ms: i64,
    /// Inter-arrival time longer than this flags a suspected gap.
    pub gap_threshold_ms: i64,
    /// Latency above this is logged and flagged as degraded.
    pub high_latency_ms: i64,
    /// Latency samples kept for percentiles.
    pub max_latency_samples: usize,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            stale_threshold_ms: 5_000,
            gap_threshold_ms: 2_000,
            high_latency_ms: 500,
            max_latency_samples: 1_000,
        }
    }
}

/// Health of a feed as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedStatus {
    Live,
    Stale,
    Disconnected,
    Replay,
}

impl FeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Live => "LIVE",
            FeedStatus::Stale => "STALE",
            FeedStatus::Disconnected => "DISCONNECTED",
            FeedStatus::Replay => "REPLAY",
        }
    }
}

/// Provenance attached to one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub exchange_timestamp: i64,
    pub received_timestamp: i64,
    pub sequence_number: u64,
    pub latency_ms: i64,
    pub is_suspected_gap: bool,
    pub feed_status: FeedStatus,
}

/// A tick together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenanced<T> {
    pub data: T,
    pub provenance: ProvenanceRecord,
}

/// Point-in-time summary of feed health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceStats {
    pub symbol: Symbol,
    pub sequence_number: u64,
    pub feed_status: FeedStatus,
    pub quality_score: u8,
    pub average_latency_ms: Option<f64>,
    pub p50_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub p99_latency_ms: Option<f64>,
    pub suspected_gaps: u64,
    pub last_received_timestamp: Option<i64>,
    pub latency_degraded: bool,
}

/// Registry of provenance engines keyed by symbol.
pub type ProvenanceRegistry = SymbolRegistry<ProvenanceEngine>;

/// Per-symbol provenance engine.
#[derive(Debug, Clone)]
pub struct ProvenanceEngine {
    symbol: Symbol,
    config: ProvenanceConfig,
    sequence: u64,
    last_received: Option<i64>,
    last_exchange: Option<i64>,
    latencies: LatencyTracker,
    suspected_gaps: u64,
    latency_degraded: bool,
    replay: bool,
}

impl ProvenanceEngine {
    pub fn new(symbol: impl Into<Symbol>, config: ProvenanceConfig) -> Self {
        let symbol = symbol.into();
        info!(
            symbol = %symbol,
            stale_threshold_ms = config.stale_threshold_ms,
            gap_threshold_ms = config.gap_threshold_ms,
            high_latency_ms = config.high_latency_ms,
            "ProvenanceEngine initialized"
        );
        Self {
            symbol,
            latencies: LatencyTracker::new(config.max_latency_samples),
            config,
            sequence: 0,
            last_received: None,
            last_exchange: None,
            suspected_gaps: 0,
            latency_degraded: false,
            replay: false,
        }
    }

    pub fn with_defaults(symbol: impl Into<Symbol>) -> Self {
        Self::new(symbol, ProvenanceConfig::default())
    }

    /// Registry that builds engines with a shared configuration.
    pub fn registry(config: ProvenanceConfig) -> ProvenanceRegistry {
        SymbolRegistry::new(move |symbol: &Symbol| ProvenanceEngine::new(symbol.clone(), config.clone()))
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn config(&self) -> &ProvenanceConfig {
        &self.config
    }

    /// Attach provenance to a tick received now.
    pub fn augment<T>(&mut self, data: T, exchange_timestamp: i64) -> Provenanced<T> {
        self.augment_at(data, exchange_timestamp, now_millis())
    }

    /// Attach provenance to a tick received at `received_at` (Unix ms).
    pub fn augment_at<T>(&mut self, data: T, exchange_timestamp: i64, received_at: i64) -> Provenanced<T> {
        self.sequence += 1;
        let latency_ms = received_at - exchange_timestamp;
        let since_last = self.last_received.map(|last| received_at - last);

        let is_suspected_gap = since_last.is_some_and(|gap| gap > self.config.gap_threshold_ms);
        if is_suspected_gap {
            self.suspected_gaps += 1;
            warn!(
                symbol = %self.symbol,
                sequence = self.sequence,
                since_last_ms = since_last.unwrap_or_default(),
                gap_threshold_ms = self.config.gap_threshold_ms,
                "Suspected feed gap"
            );
        }

        let feed_status = if self.replay {
            FeedStatus::Replay
        } else if since_last.is_some_and(|gap| gap > self.config.stale_threshold_ms) {
            FeedStatus::Stale
        } else {
            FeedStatus::Live
        };

        let degraded = latency_ms > self.config.high_latency_ms;
        if degraded && !self.latency_degraded {
            warn!(
                symbol = %self.symbol,
                latency_ms,
                high_latency_ms = self.config.high_latency_ms,
                "Feed latency degraded"
            );
        } else if !degraded && self.latency_degraded {
            info!(symbol = %self.symbol, latency_ms, "Feed latency recovered");
        }
        self.latency_degraded = degraded;

        self.latencies.record(latency_ms as f64);
        self.last_received = Some(received_at);
        self.last_exchange = Some(exchange_timestamp);

        debug!(
            symbol = %self.symbol,
            sequence = self.sequence,
            latency_ms,
            status = feed_status.as_str(),
            "Tick augmented"
        );

        Provenanced {
            data,
            provenance: ProvenanceRecord {
                exchange_timestamp,
                received_timestamp: received_at,
                sequence_number: self.sequence,
                latency_ms,
                is_suspected_gap,
                feed_status,
            },
        }
    }

    /// Feed status against the wall clock.
    pub fn feed_status(&self) -> FeedStatus {
        self.feed_status_at(now_millis())
    }

    /// Feed status as of `now` (Unix ms).
    pub fn feed_status_at(&self, now: i64) -> FeedStatus {
        match self.last_received {
            None => FeedStatus::Disconnected,
            Some(_) if self.replay => FeedStatus::Replay,
            Some(last) if now - last > self.config.stale_threshold_ms => FeedStatus::Stale,
            Some(_) => FeedStatus::Live,
        }
    }

    pub fn quality_score(&self) -> u8 {
        self.quality_score_at(now_millis())
    }

    /// 0–100 score: DISCONNECTED 0, STALE 25, REPLAY 75, LIVE tiered by
    /// average latency.
    pub fn quality_score_at(&self, now: i64) -> u8 {
        match self.feed_status_at(now) {
            FeedStatus::Disconnected => 0,
            FeedStatus::Stale => 25,
            FeedStatus::Replay => 75,
            FeedStatus::Live => match self.latencies.average() {
                None => 100,
                Some(avg) if avg < 50.0 => 100,
                Some(avg) if avg < 100.0 => 90,
                Some(avg) if avg < 250.0 => 80,
                Some(avg) if avg < 500.0 => 70,
                Some(avg) if avg < 1000.0 => 60,
                Some(_) => 50,
            },
        }
    }

    /// Latency at percentile `p` in `[0, 1]` over the sample window.
    pub fn latency_percentile(&self, p: f64) -> Option<f64> {
        self.latencies.percentile(p)
    }

    pub fn average_latency(&self) -> Option<f64> {
        self.latencies.average()
    }

    /// Whether the most recent tick exceeded the high-latency threshold.
    pub fn is_latency_degraded(&self) -> bool {
        self.latency_degraded
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence
    }

    pub fn suspected_gaps(&self) -> u64 {
        self.suspected_gaps
    }

    pub fn last_received(&self) -> Option<i64> {
        self.last_received
    }

    pub fn last_exchange_timestamp(&self) -> Option<i64> {
        self.last_exchange
    }

    /// Mark the feed as a historical replay. Status reports REPLAY once a
    /// tick has been received.
    pub fn set_replay_mode(&mut self, replay: bool) {
        if self.replay != replay {
            info!(symbol = %self.symbol, replay, "Replay mode changed");
        }
        self.replay = replay;
    }

    pub fn is_replay(&self) -> bool {
        self.replay
    }

    pub fn stats(&self) -> ProvenanceStats {
        self.stats_at(now_millis())
    }

    pub fn stats_at(&self, now: i64) -> ProvenanceStats {
        ProvenanceStats {
            symbol: self.symbol.clone(),
            sequence_number: self.sequence,
            feed_status: self.feed_status_at(now),
            quality_score: self.quality_score_at(now),
            average_latency_ms: self.latencies.average(),
            p50_latency_ms: self.latencies.percentile(0.50),
            p95_latency_ms: self.latencies.percentile(0.95),
            p99_latency_ms: self.latencies.percentile(0.99),
            suspected_gaps: self.suspected_gaps,
            last_received_timestamp: self.last_received,
            latency_degraded: self.latency_degraded,
        }
    }

    /// Zero the sequence, timestamps, samples and gap counter.
    pub fn reset(&mut self) {
        info!(symbol = %self.symbol, sequence = self.sequence, "ProvenanceEngine reset");
        self.sequence = 0;
        self.last_received = None;
        self.last_exchange = None;
        self.latencies.clear();
        self.suspected_gaps = 0;
        self.latency_degraded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_disconnected_before_first_tick() {
        let engine = ProvenanceEngine::with_defaults("BTCUSDT");
        assert_eq!(engine.feed_status_at(T0), FeedStatus::Disconnected);
        assert_eq!(engine.quality_score_at(T0), 0);
    }

    #[test]
    fn test_sequence_and_latency() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        let first = engine.augment_at(42.0, T0 - 20, T0);
        let second = engine.augment_at(43.0, T0 + 80, T0 + 100);

        assert_eq!(first.data, 42.0);
        assert_eq!(first.provenance.sequence_number, 1);
        assert_eq!(first.provenance.latency_ms, 20);
        assert!(!first.provenance.is_suspected_gap);
        assert_eq!(first.provenance.feed_status, FeedStatus::Live);
        assert_eq!(second.provenance.sequence_number, 2);
        assert_eq!(second.provenance.received_timestamp, T0 + 100);
    }

    #[test]
    fn test_gap_detection() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        engine.augment_at((), T0, T0);
        let ok = engine.augment_at((), T0 + 2_000, T0 + 2_000);
        let gap = engine.augment_at((), T0 + 4_001, T0 + 4_001);

        assert!(!ok.provenance.is_suspected_gap);
        assert!(gap.provenance.is_suspected_gap);
        assert_eq!(engine.suspected_gaps(), 1);
    }

    #[test]
    fn test_tick_after_long_silence_is_stamped_stale() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        engine.augment_at((), T0, T0);
        let late = engine.augment_at((), T0 + 6_000, T0 + 6_000);
        assert_eq!(late.provenance.feed_status, FeedStatus::Stale);
        assert!(late.provenance.is_suspected_gap);
        // The feed is flowing again.
        assert_eq!(engine.feed_status_at(T0 + 6_001), FeedStatus::Live);
    }

    #[test]
    fn test_live_to_stale_without_new_tick() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        engine.augment_at((), T0 - 10, T0);

        assert_eq!(engine.feed_status_at(T0 + 1_000), FeedStatus::Live);
        assert_eq!(engine.feed_status_at(T0 + 5_000), FeedStatus::Live);
        assert_eq!(engine.feed_status_at(T0 + 5_001), FeedStatus::Stale);
        assert_eq!(engine.quality_score_at(T0 + 6_000), 25);
    }

    #[test]
    fn test_high_latency_stays_live_but_flagged() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        let tick = engine.augment_at((), T0 - 800, T0);

        assert_eq!(tick.provenance.feed_status, FeedStatus::Live);
        assert!(engine.is_latency_degraded());
        assert_eq!(engine.quality_score_at(T0), 60);

        engine.augment_at((), T0 + 90, T0 + 100);
        assert!(!engine.is_latency_degraded());
    }

    #[test]
    fn test_quality_tiers() {
        let cases = [(10, 100), (60, 90), (150, 80), (300, 70), (700, 60), (1_500, 50)];
        for (latency, expected) in cases {
            let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
            engine.augment_at((), T0 - latency, T0);
            assert_eq!(engine.quality_score_at(T0), expected, "latency {}", latency);
        }
    }

    #[test]
    fn test_replay_mode() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        engine.set_replay_mode(true);
        assert_eq!(engine.feed_status_at(T0), FeedStatus::Disconnected);

        let tick = engine.augment_at((), T0 - 3_600_000, T0);
        assert_eq!(tick.provenance.feed_status, FeedStatus::Replay);
        assert_eq!(engine.feed_status_at(T0 + 60_000), FeedStatus::Replay);
        assert_eq!(engine.quality_score_at(T0), 75);
    }

    #[test]
    fn test_percentiles_over_window() {
        let config = ProvenanceConfig {
            max_latency_samples: 100,
            ..Default::default()
        };
        let mut engine = ProvenanceEngine::new("BTCUSDT", config);
        for i in 1..=100 {
            engine.augment_at((), T0 + i * 10 - i, T0 + i * 10);
        }
        assert_eq!(engine.latency_percentile(0.5), Some(50.0));
        assert_eq!(engine.latency_percentile(0.95), Some(95.0));
        assert_eq!(engine.latency_percentile(0.99), Some(99.0));

        let stats = engine.stats_at(T0 + 1_000);
        assert_eq!(stats.sequence_number, 100);
        assert_eq!(stats.p95_latency_ms, Some(95.0));
        assert_eq!(stats.feed_status, FeedStatus::Live);
    }

    #[test]
    fn test_reset() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        engine.augment_at((), T0, T0);
        engine.augment_at((), T0 + 3_000, T0 + 3_000);
        engine.reset();

        assert_eq!(engine.sequence_number(), 0);
        assert_eq!(engine.suspected_gaps(), 0);
        assert_eq!(engine.average_latency(), None);
        assert_eq!(engine.feed_status_at(T0 + 3_001), FeedStatus::Disconnected);
        assert_eq!(engine.augment_at((), T0, T0 + 4_000).provenance.sequence_number, 1);
    }

    #[test]
    fn test_registry_isolates_symbols() {
        let mut registry = ProvenanceEngine::registry(ProvenanceConfig::default());
        let btc = Symbol::new("BTCUSDT");
        let eth = Symbol::new("ETHUSDT");

        registry.engine(&btc).augment_at((), T0, T0);
        registry.engine(&btc).augment_at((), T0, T0 + 10);
        registry.engine(&eth).augment_at((), T0, T0);

        assert_eq!(registry.get(&btc).unwrap().sequence_number(), 2);
        assert_eq!(registry.get(&eth).unwrap().sequence_number(), 1);
    }

    #[test]
    fn test_record_serialization() {
        let mut engine = ProvenanceEngine::with_defaults("BTCUSDT");
        let tick = engine.augment_at(1.5, T0 - 5, T0);
        let json = serde_json::to_value(&tick).unwrap();
        assert_eq!(json["provenance"]["feedStatus"], "LIVE");
        assert_eq!(json["provenance"]["sequenceNumber"], 1);
        assert_eq!(json["provenance"]["latencyMs"], 5);
    }
}
