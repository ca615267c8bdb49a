//! Notification side effects of a triggered alert
//!
//! The engine asks a notifier for a user-facing notification and for an
//! audible cue. Both are best-effort: the engine logs failures and carries on.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use types::ids::{AlertId, Symbol};

use super::model::Alert;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),

    #[error("notification failed: {0}")]
    Failed(String),
}

/// Receiver of alert side effects.
pub trait AlertNotifier: Send + Sync {
    /// Show a notification for `alert`, fired at `price`.
    fn notify(&self, alert: &Alert, price: f64) -> Result<(), NotifyError>;

    /// Play the alert sound.
    fn play_sound(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn notify(&self, alert: &Alert, price: f64) -> Result<(), NotifyError> {
        info!(
            alert_id = %alert.id,
            symbol = %alert.symbol,
            price,
            message = %alert.describe(),
            "Alert triggered"
        );
        Ok(())
    }

    fn play_sound(&self, _alert: &Alert) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Side-effect request handed to an external UI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertNotification {
    #[serde(rename_all = "camelCase")]
    Notification {
        alert_id: AlertId,
        symbol: Symbol,
        title: String,
        body: String,
        price: f64,
    },
    #[serde(rename_all = "camelCase")]
    Sound { alert_id: AlertId },
}

/// Default depth of the notification queue.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 256;

/// Forwards side-effect requests over a bounded channel.
///
/// Never waits: a full queue drops the request with [`NotifyError::Failed`],
/// a closed one fails with [`NotifyError::Unavailable`].
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<AlertNotification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<AlertNotification>) -> Self {
        Self { tx }
    }

    /// Notifier plus the receiver the collaborator reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AlertNotification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    fn send(&self, notification: AlertNotification) -> Result<(), NotifyError> {
        self.tx.try_send(notification).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => NotifyError::Failed("notification queue full".to_string()),
            mpsc::error::TrySendError::Closed(_) => NotifyError::Unavailable("receiver dropped".to_string()),
        })
    }
}

impl AlertNotifier for ChannelNotifier {
    fn notify(&self, alert: &Alert, price: f64) -> Result<(), NotifyError> {
        self.send(AlertNotification::Notification {
            alert_id: alert.id,
            symbol: alert.symbol.clone(),
            title: format!("{} alert", alert.symbol),
            body: alert.describe(),
            price,
        })
    }

    fn play_sound(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.send(AlertNotification::Sound { alert_id: alert.id })
    }
}
