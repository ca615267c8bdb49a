//! Alert infrastructure module
//!
//! Contains the alert model, the single-writer rule engine, the notifier
//! seam, the persistence boundary and the async service that drives
//! cooldown resets.

pub mod engine;
pub mod model;
pub mod notifier;
pub mod service;
pub mod store;

pub use engine::{AlertEngine, ScheduledReset};
pub use model::{Alert, AlertCondition, AlertConfig, AlertType, AlertUpdate, HistoryRecord, NewAlert};
pub use notifier::{
    AlertNotification, AlertNotifier, ChannelNotifier, LogNotifier, NotifyError, DEFAULT_NOTIFICATION_CAPACITY,
};
pub use service::AlertService;
pub use store::{AlertStore, AlertStoreError, JsonFileAlertStore};
