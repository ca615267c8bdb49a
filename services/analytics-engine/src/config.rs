//! Engine configuration
//!
//! Each engine owns a `*Config` struct with defaults; `AnalyticsConfig`
//! groups them so one JSON document configures a whole deployment. Every
//! section and field is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use types::errors::AnalyticsError;

use crate::alerts::AlertConfig;
use crate::heatmap::{HeatmapConfig, DEFAULT_SNAPSHOT_CAPACITY};
use crate::ofi::OfiConfig;
use crate::provenance::ProvenanceConfig;
use crate::thinner::ThinnerConfig;
use crate::worker::WorkerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] AnalyticsError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub provenance: ProvenanceConfig,
    pub ofi: OfiConfig,
    pub thinner: ThinnerConfig,
    pub heatmap: HeatmapConfig,
    pub snapshot_buffer_capacity: usize,
    pub alerts: AlertConfig,
    pub worker: WorkerConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            provenance: ProvenanceConfig::default(),
            ofi: OfiConfig::default(),
            thinner: ThinnerConfig::default(),
            heatmap: HeatmapConfig::default(),
            snapshot_buffer_capacity: DEFAULT_SNAPSHOT_CAPACITY,
            alerts: AlertConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let p = &self.provenance;
        for (name, value) in [
            ("provenance.stale_threshold_ms", p.stale_threshold_ms),
            ("provenance.gap_threshold_ms", p.gap_threshold_ms),
            ("provenance.high_latency_ms", p.high_latency_ms),
        ] {
            if value <= 0 {
                return Err(invalid(name, value));
            }
        }
        if p.max_latency_samples == 0 {
            return Err(invalid("provenance.max_latency_samples", 0));
        }

        if self.ofi.history_capacity < 2 {
            return Err(invalid("ofi.history_capacity", self.ofi.history_capacity));
        }
        if !self.ofi.z_score_threshold.is_finite() || self.ofi.z_score_threshold <= 0.0 {
            return Err(invalid("ofi.z_score_threshold", self.ofi.z_score_threshold));
        }

        if self.thinner.throttle_ms < 0 {
            return Err(invalid("thinner.throttle_ms", self.thinner.throttle_ms));
        }

        self.heatmap.validate()?;
        if self.snapshot_buffer_capacity == 0 {
            return Err(invalid("snapshot_buffer_capacity", 0));
        }

        if self.alerts.default_cooldown_ms < 0 {
            return Err(invalid("alerts.default_cooldown_ms", self.alerts.default_cooldown_ms));
        }
        if !self.alerts.equals_tolerance.is_finite() || self.alerts.equals_tolerance < 0.0 {
            return Err(invalid("alerts.equals_tolerance", self.alerts.equals_tolerance));
        }

        if self.worker.queue_capacity == 0 {
            return Err(invalid("worker.queue_capacity", 0));
        }
        if self.worker.response_capacity == 0 {
            return Err(invalid("worker.response_capacity", 0));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::InvalidConfig(format!("{} out of range: {}", name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalyticsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provenance.stale_threshold_ms, 5_000);
        assert_eq!(config.provenance.gap_threshold_ms, 2_000);
        assert_eq!(config.ofi.history_capacity, 1_000);
        assert_eq!(config.alerts.history_capacity, 100);
        assert_eq!(config.snapshot_buffer_capacity, 600);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config = AnalyticsConfig::from_json_str(
            r#"{"provenance": {"stale_threshold_ms": 10000}, "heatmap": {"price_bin_size": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.provenance.stale_threshold_ms, 10_000);
        assert_eq!(config.provenance.gap_threshold_ms, 2_000);
        assert_eq!(config.heatmap.price_bin_size, 0.5);
        assert_eq!(config.heatmap.time_bin_seconds, 5.0);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(AnalyticsConfig::from_json_str("{}").unwrap(), AnalyticsConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AnalyticsConfig::from_json_str(r#"{"heatmap": {"time_bin_seconds": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(AnalyticsError::InvalidConfig(_))));

        let err = AnalyticsConfig::from_json_str(r#"{"worker": {"queue_capacity": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AnalyticsConfig::from_json_str(r#"{"worker": {"response_capacity": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            AnalyticsConfig::from_json_str("{").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");
        std::fs::write(&path, r#"{"thinner": {"throttle_ms": 250}}"#).unwrap();

        let config = AnalyticsConfig::from_file(&path).unwrap();
        assert_eq!(config.thinner.throttle_ms, 250);

        assert!(matches!(
            AnalyticsConfig::from_file(dir.path().join("missing.json")).unwrap_err(),
            ConfigError::Io(_)
        ));
    }
}
