//! Alert records and the requests that create or change them

use serde::{Deserialize, Serialize};
use types::errors::AnalyticsError;
use types::ids::{AlertId, Symbol};

/// What an alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Price,
    Indicator,
    /// Reserved; volume alerts are stored but never evaluated.
    Volume,
}

/// Comparison applied to price alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
    Equals,
}

/// Engine-wide alert settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Maximum number of history records kept.
    pub history_capacity: usize,
    /// Cooldown for repeating alerts that do not set their own.
    pub default_cooldown_ms: i64,
    /// Tolerance of the `equals` condition.
    pub equals_tolerance: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            default_cooldown_ms: 60_000,
            equals_tolerance: 0.01,
        }
    }
}

/// A user-defined alert rule and its trigger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub condition: AlertCondition,
    pub value: f64,
    /// Indicator name looked up in the values passed to `check_alerts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    pub enabled: bool,
    pub triggered: bool,
    #[serde(default)]
    pub repeating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub last_triggered: Option<i64>,
}

impl Alert {
    /// Enabled and not yet triggered.
    pub fn is_armed(&self) -> bool {
        self.enabled && !self.triggered
    }

    /// Human-readable description used by notifiers.
    pub fn describe(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match self.alert_type {
            AlertType::Price => {
                let condition = match self.condition {
                    AlertCondition::Above => "above",
                    AlertCondition::Below => "below",
                    AlertCondition::Equals => "at",
                };
                format!("{} price {} {}", self.symbol, condition, self.value)
            }
            AlertType::Indicator => format!(
                "{} {} reached {}",
                self.symbol,
                self.indicator.as_deref().unwrap_or("indicator"),
                self.value
            ),
            AlertType::Volume => format!("{} volume {}", self.symbol, self.value),
        }
    }
}

/// Request to create an alert. The engine assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub condition: AlertCondition,
    pub value: f64,
    #[serde(default)]
    pub indicator: Option<String>,
    #[serde(default)]
    pub repeating: bool,
    #[serde(default)]
    pub cooldown_ms: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NewAlert {
    pub fn price(symbol: impl Into<Symbol>, condition: AlertCondition, value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            alert_type: AlertType::Price,
            condition,
            value,
            indicator: None,
            repeating: false,
            cooldown_ms: None,
            message: None,
        }
    }

    /// Triggers when the named indicator is at or above `value`.
    pub fn indicator(symbol: impl Into<Symbol>, indicator: impl Into<String>, value: f64) -> Self {
        Self {
            alert_type: AlertType::Indicator,
            indicator: Some(indicator.into()),
            ..Self::price(symbol, AlertCondition::Above, value)
        }
    }

    pub fn volume(symbol: impl Into<Symbol>, condition: AlertCondition, value: f64) -> Self {
        Self {
            alert_type: AlertType::Volume,
            ..Self::price(symbol, condition, value)
        }
    }

    /// Re-arm after `cooldown_ms` instead of disabling on trigger.
    pub fn repeating(mut self, cooldown_ms: Option<i64>) -> Self {
        self.repeating = true;
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.value.is_finite() {
            return Err(AnalyticsError::InvalidInput(format!(
                "alert threshold must be finite, got {}",
                self.value
            )));
        }
        if self.alert_type == AlertType::Indicator && self.indicator.as_deref().map_or(true, str::is_empty) {
            return Err(AnalyticsError::InvalidInput(
                "indicator alert requires an indicator name".to_string(),
            ));
        }
        if matches!(self.cooldown_ms, Some(ms) if ms < 0) {
            return Err(AnalyticsError::InvalidInput("cooldown must not be negative".to_string()));
        }
        Ok(())
    }
}

/// Partial change to an existing alert. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertUpdate {
    pub condition: Option<AlertCondition>,
    pub value: Option<f64>,
    pub indicator: Option<String>,
    pub enabled: Option<bool>,
    pub repeating: Option<bool>,
    pub cooldown_ms: Option<i64>,
    pub message: Option<String>,
}

/// Immutable copy of an alert taken when it fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub alert: Alert,
    pub triggered_at: i64,
    /// Price passed to `check_alerts` when the alert fired.
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_alert_validation() {
        assert!(NewAlert::price("BTC", AlertCondition::Above, 100.0).validate().is_ok());
        assert!(NewAlert::price("BTC", AlertCondition::Above, f64::NAN).validate().is_err());
        assert!(NewAlert::indicator("BTC", "", 70.0).validate().is_err());
        assert!(NewAlert::price("BTC", AlertCondition::Above, 1.0)
            .repeating(Some(-1))
            .validate()
            .is_err());
    }

    #[test]
    fn test_alert_wire_format() {
        let alert = Alert {
            id: AlertId::new(),
            symbol: Symbol::new("BTCUSDT"),
            alert_type: AlertType::Price,
            condition: AlertCondition::Above,
            value: 100.0,
            indicator: None,
            enabled: true,
            triggered: false,
            repeating: false,
            cooldown_ms: None,
            message: None,
            created_at: 1,
            last_triggered: None,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "price");
        assert_eq!(json["condition"], "above");
        assert_eq!(json["createdAt"], 1);
        assert!(json.get("indicator").is_none());

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }

    #[test]
    fn test_describe() {
        let new = NewAlert::indicator("ETH", "rsi", 70.0);
        let alert = Alert {
            id: AlertId::new(),
            symbol: new.symbol,
            alert_type: new.alert_type,
            condition: new.condition,
            value: new.value,
            indicator: new.indicator,
            enabled: true,
            triggered: false,
            repeating: false,
            cooldown_ms: None,
            message: None,
            created_at: 0,
            last_triggered: None,
        };
        assert_eq!(alert.describe(), "ETH rsi reached 70");
    }
}
