//! Alert rule engine
//!
//! Owns every alert and is the single writer of their state. An alert moves
//! from armed (`enabled`, not `triggered`) to triggered when its condition
//! matches. Non-repeating alerts are then disabled for good; repeating ones
//! get a [`ScheduledReset`] that re-arms them once the cooldown has elapsed.
//!
//! Resets are plain data. They fire when `run_due_resets` is called with a
//! time at or past `due_at` (every `check_alerts_at` call does this first),
//! or from the timer task of [`AlertService`](super::AlertService).

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::AnalyticsError;
use types::ids::{AlertId, Symbol};

use super::model::{Alert, AlertCondition, AlertConfig, AlertType, AlertUpdate, HistoryRecord, NewAlert};
use super::notifier::{AlertNotifier, LogNotifier};
use super::store::{AlertStore, AlertStoreError};
use crate::now_millis;

/// Pending re-arm of a repeating alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReset {
    pub alert_id: AlertId,
    /// Unix ms at which the alert becomes armed again.
    pub due_at: i64,
}

pub struct AlertEngine {
    config: AlertConfig,
    alerts: BTreeMap<AlertId, Alert>,
    history: VecDeque<HistoryRecord>,
    resets: BTreeMap<AlertId, ScheduledReset>,
    notifier: Box<dyn AlertNotifier>,
}

impl AlertEngine {
    pub fn new(config: AlertConfig, notifier: Box<dyn AlertNotifier>) -> Self {
        info!(
            history_capacity = config.history_capacity,
            default_cooldown_ms = config.default_cooldown_ms,
            "AlertEngine initialized"
        );
        Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            alerts: BTreeMap::new(),
            resets: BTreeMap::new(),
            notifier,
        }
    }

    /// Engine with default configuration that logs notifications.
    pub fn with_defaults() -> Self {
        Self::new(AlertConfig::default(), Box::new(LogNotifier))
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn add_alert(&mut self, new: NewAlert) -> Result<Alert, AnalyticsError> {
        self.add_alert_at(new, now_millis())
    }

    /// Create an armed alert. The id is assigned here.
    pub fn add_alert_at(&mut self, new: NewAlert, now: i64) -> Result<Alert, AnalyticsError> {
        new.validate()?;
        let alert = Alert {
            id: AlertId::new(),
            symbol: new.symbol,
            alert_type: new.alert_type,
            condition: new.condition,
            value: new.value,
            indicator: new.indicator,
            enabled: true,
            triggered: false,
            repeating: new.repeating,
            cooldown_ms: new.cooldown_ms,
            message: new.message,
            created_at: now,
            last_triggered: None,
        };
        info!(
            alert_id = %alert.id,
            symbol = %alert.symbol,
            alert_type = ?alert.alert_type,
            value = alert.value,
            "Alert added"
        );
        self.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    /// Flip `enabled`. Enabling also re-arms a triggered alert.
    pub fn toggle_alert(&mut self, id: AlertId) -> Option<&Alert> {
        self.cancel_reset(id);
        let alert = self.alerts.get_mut(&id)?;
        alert.enabled = !alert.enabled;
        if alert.enabled {
            alert.triggered = false;
        }
        debug!(alert_id = %id, enabled = alert.enabled, "Alert toggled");
        Some(&*alert)
    }

    /// Apply `update` and re-arm the alert against its new rule.
    pub fn update_alert(&mut self, id: AlertId, update: AlertUpdate) -> Result<Option<&Alert>, AnalyticsError> {
        if let Some(value) = update.value {
            if !value.is_finite() {
                return Err(AnalyticsError::InvalidInput(format!(
                    "alert threshold must be finite, got {}",
                    value
                )));
            }
        }
        if matches!(update.cooldown_ms, Some(ms) if ms < 0) {
            return Err(AnalyticsError::InvalidInput("cooldown must not be negative".to_string()));
        }
        if !self.alerts.contains_key(&id) {
            return Ok(None);
        }

        self.cancel_reset(id);
        let Some(alert) = self.alerts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(condition) = update.condition {
            alert.condition = condition;
        }
        if let Some(value) = update.value {
            alert.value = value;
        }
        if let Some(indicator) = update.indicator {
            alert.indicator = Some(indicator);
        }
        if let Some(enabled) = update.enabled {
            alert.enabled = enabled;
        }
        if let Some(repeating) = update.repeating {
            alert.repeating = repeating;
        }
        if let Some(cooldown_ms) = update.cooldown_ms {
            alert.cooldown_ms = Some(cooldown_ms);
        }
        if let Some(message) = update.message {
            alert.message = Some(message);
        }
        alert.triggered = false;
        debug!(alert_id = %id, "Alert updated");
        Ok(Some(&*alert))
    }

    pub fn delete_alert(&mut self, id: AlertId) -> Option<Alert> {
        self.cancel_reset(id);
        let removed = self.alerts.remove(&id);
        if removed.is_some() {
            info!(alert_id = %id, "Alert deleted");
        }
        removed
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.get(&id)
    }

    /// All alerts in creation order.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    pub fn alerts_for<'a>(&'a self, symbol: &'a Symbol) -> impl Iterator<Item = &'a Alert> + 'a {
        self.alerts.values().filter(move |a| &a.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Number of armed alerts.
    pub fn armed_count(&self) -> usize {
        self.alerts.values().filter(|a| a.is_armed()).count()
    }

    /// Trigger history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    pub fn check_alerts(
        &mut self,
        symbol: &Symbol,
        price: f64,
        indicators: Option<&HashMap<String, f64>>,
    ) -> Vec<Alert> {
        self.check_alerts_at(symbol, price, indicators, now_millis())
    }

    /// Evaluate the armed alerts of `symbol` and return those that fired.
    pub fn check_alerts_at(
        &mut self,
        symbol: &Symbol,
        price: f64,
        indicators: Option<&HashMap<String, f64>>,
        now: i64,
    ) -> Vec<Alert> {
        self.run_due_resets(now);

        if !price.is_finite() {
            debug!(symbol = %symbol, price, "Ignoring non-finite price");
            return Vec::new();
        }

        let tolerance = self.config.equals_tolerance;
        let matched: Vec<AlertId> = self
            .alerts
            .values()
            .filter(|a| &a.symbol == symbol && a.is_armed())
            .filter(|a| condition_met(a, price, indicators, tolerance))
            .map(|a| a.id)
            .collect();

        let mut fired = Vec::with_capacity(matched.len());
        for id in matched {
            if let Some(alert) = self.trigger(id, price, now) {
                fired.push(alert);
            }
        }
        fired
    }

    fn trigger(&mut self, id: AlertId, price: f64, now: i64) -> Option<Alert> {
        let default_cooldown = self.config.default_cooldown_ms;
        let alert = self.alerts.get_mut(&id)?;
        alert.triggered = true;
        alert.last_triggered = Some(now);

        if alert.repeating {
            let cooldown = alert.cooldown_ms.unwrap_or(default_cooldown);
            self.resets.insert(
                id,
                ScheduledReset {
                    alert_id: id,
                    due_at: now.saturating_add(cooldown),
                },
            );
        } else {
            alert.enabled = false;
        }
        let alert = alert.clone();

        info!(
            alert_id = %id,
            symbol = %alert.symbol,
            price,
            repeating = alert.repeating,
            "Alert fired"
        );

        if self.config.history_capacity > 0 {
            if self.history.len() >= self.config.history_capacity {
                self.history.pop_front();
            }
            self.history.push_back(HistoryRecord {
                alert: alert.clone(),
                triggered_at: now,
                price,
            });
        }

        if let Err(err) = self.notifier.notify(&alert, price) {
            warn!(alert_id = %id, error = %err, "Alert notification failed");
        }
        if let Err(err) = self.notifier.play_sound(&alert) {
            warn!(alert_id = %id, error = %err, "Alert sound failed");
        }

        Some(alert)
    }

    // ------------------------------------------------------------------
    // Cooldown resets
    // ------------------------------------------------------------------

    /// Re-arm every alert whose reset is due at `now`. Returns their ids.
    pub fn run_due_resets(&mut self, now: i64) -> Vec<AlertId> {
        let due: Vec<AlertId> = self
            .resets
            .values()
            .filter(|r| r.due_at <= now)
            .map(|r| r.alert_id)
            .collect();

        for id in &due {
            self.resets.remove(id);
            if let Some(alert) = self.alerts.get_mut(id) {
                alert.triggered = false;
                debug!(alert_id = %id, "Alert re-armed after cooldown");
            }
        }
        due
    }

    /// Earliest pending reset time.
    pub fn next_reset_due(&self) -> Option<i64> {
        self.resets.values().map(|r| r.due_at).min()
    }

    pub fn pending_reset(&self, id: AlertId) -> Option<ScheduledReset> {
        self.resets.get(&id).copied()
    }

    /// Drop the pending reset of `id`. Returns whether one existed.
    pub fn cancel_reset(&mut self, id: AlertId) -> bool {
        self.resets.remove(&id).is_some()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Copy of every alert for persistence.
    pub fn export(&self) -> Vec<Alert> {
        self.alerts.values().cloned().collect()
    }

    /// Replace all alerts. Trigger state is not restored: every alert comes
    /// back untriggered and pending resets are dropped.
    pub fn restore(&mut self, alerts: Vec<Alert>) {
        self.resets.clear();
        self.alerts = alerts
            .into_iter()
            .map(|mut alert| {
                alert.triggered = false;
                (alert.id, alert)
            })
            .collect();
        info!(alerts = self.alerts.len(), "Alerts restored");
    }

    pub fn save_to(&self, store: &dyn AlertStore) -> Result<(), AlertStoreError> {
        store.save(&self.export())
    }

    pub fn load_from(&mut self, store: &dyn AlertStore) -> Result<(), AlertStoreError> {
        let alerts = store.load()?;
        self.restore(alerts);
        Ok(())
    }
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEngine")
            .field("config", &self.config)
            .field("alerts", &self.alerts.len())
            .field("history", &self.history.len())
            .field("pending_resets", &self.resets.len())
            .finish()
    }
}

fn condition_met(alert: &Alert, price: f64, indicators: Option<&HashMap<String, f64>>, tolerance: f64) -> bool {
    match alert.alert_type {
        AlertType::Price => match alert.condition {
            AlertCondition::Above => price > alert.value,
            AlertCondition::Below => price < alert.value,
            AlertCondition::Equals => (price - alert.value).abs() <= tolerance,
        },
        AlertType::Indicator => alert
            .indicator
            .as_ref()
            .and_then(|name| indicators?.get(name))
            .is_some_and(|current| current.is_finite() && *current >= alert.value),
        AlertType::Volume => false,
    }
}
