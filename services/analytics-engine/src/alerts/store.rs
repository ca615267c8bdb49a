//! Alert persistence boundary
//!
//! Alerts are persisted as a JSON array of [`Alert`] records. Trigger state
//! is never trusted on load: every alert comes back with `triggered = false`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::model::Alert;

#[derive(Debug, thiserror::Error)]
pub enum AlertStoreError {
    #[error("alert store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("alert store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Where the alert set is loaded from and saved to.
pub trait AlertStore: Send + Sync {
    fn load(&self) -> Result<Vec<Alert>, AlertStoreError>;

    fn save(&self, alerts: &[Alert]) -> Result<(), AlertStoreError>;
}

/// Alert set stored in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileAlertStore {
    path: PathBuf,
}

impl JsonFileAlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertStore for JsonFileAlertStore {
    /// A missing file is an empty alert set.
    fn load(&self) -> Result<Vec<Alert>, AlertStoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No alert file, starting empty");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let mut alerts: Vec<Alert> = serde_json::from_str(&raw)?;
        for alert in &mut alerts {
            alert.triggered = false;
        }
        info!(path = %self.path.display(), alerts = alerts.len(), "Alerts loaded");
        Ok(alerts)
    }

    /// Write to a sibling temp file, then rename over the target.
    fn save(&self, alerts: &[Alert]) -> Result<(), AlertStoreError> {
        let json = serde_json::to_vec_pretty(alerts)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), alerts = alerts.len(), "Alerts saved");
        Ok(())
    }
}
