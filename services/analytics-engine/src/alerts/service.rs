//! Async owner of an [`AlertEngine`]
//!
//! Serializes access to the engine behind a `tokio::sync::Mutex` and runs a
//! timer task that re-arms repeating alerts when their cooldown expires,
//! without waiting for the next price check. The task sleeps until the
//! earliest pending reset and is woken whenever the schedule may have changed.
//!
//! Time is read from the tokio clock anchored to the wall clock at start-up,
//! so a paused test runtime drives cooldowns deterministically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use types::errors::AnalyticsError;
use types::ids::{AlertId, Symbol};

use super::engine::AlertEngine;
use super::model::{Alert, AlertUpdate, HistoryRecord, NewAlert};
use super::store::{AlertStore, AlertStoreError};
use crate::now_millis;

#[derive(Debug, Clone, Copy)]
struct ServiceClock {
    epoch_ms: i64,
    started: Instant,
}

impl ServiceClock {
    fn start() -> Self {
        Self {
            epoch_ms: now_millis(),
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> i64 {
        self.epoch_ms + self.started.elapsed().as_millis() as i64
    }
}

pub struct AlertService {
    engine: Arc<Mutex<AlertEngine>>,
    wake: Arc<Notify>,
    clock: ServiceClock,
    timer: JoinHandle<()>,
}

impl AlertService {
    /// Take ownership of `engine` and start the reset timer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(engine: AlertEngine) -> Self {
        let engine = Arc::new(Mutex::new(engine));
        let wake = Arc::new(Notify::new());
        let clock = ServiceClock::start();
        let timer = tokio::spawn(run_reset_timer(engine.clone(), wake.clone(), clock));
        info!("AlertService started");
        Self {
            engine,
            wake,
            clock,
            timer,
        }
    }

    /// Current service time in Unix ms.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub async fn add_alert(&self, new: NewAlert) -> Result<Alert, AnalyticsError> {
        let now = self.now_ms();
        self.engine.lock().await.add_alert_at(new, now)
    }

    pub async fn toggle_alert(&self, id: AlertId) -> Option<Alert> {
        let toggled = self.engine.lock().await.toggle_alert(id).cloned();
        self.wake.notify_one();
        toggled
    }

    pub async fn update_alert(&self, id: AlertId, update: AlertUpdate) -> Result<Option<Alert>, AnalyticsError> {
        let updated = self.engine.lock().await.update_alert(id, update)?.cloned();
        self.wake.notify_one();
        Ok(updated)
    }

    pub async fn delete_alert(&self, id: AlertId) -> Option<Alert> {
        let deleted = self.engine.lock().await.delete_alert(id);
        self.wake.notify_one();
        deleted
    }

    pub async fn alert(&self, id: AlertId) -> Option<Alert> {
        self.engine.lock().await.get(id).cloned()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.engine.lock().await.export()
    }

    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.engine.lock().await.history().cloned().collect()
    }

    /// Evaluate alerts for `symbol` at the current service time.
    pub async fn check_alerts(
        &self,
        symbol: &Symbol,
        price: f64,
        indicators: Option<&HashMap<String, f64>>,
    ) -> Vec<Alert> {
        let now = self.now_ms();
        let fired = self
            .engine
            .lock()
            .await
            .check_alerts_at(symbol, price, indicators, now);
        if fired.iter().any(|a| a.repeating) {
            self.wake.notify_one();
        }
        fired
    }

    pub async fn save_to(&self, store: &dyn AlertStore) -> Result<(), AlertStoreError> {
        self.engine.lock().await.save_to(store)
    }

    pub async fn load_from(&self, store: &dyn AlertStore) -> Result<(), AlertStoreError> {
        self.engine.lock().await.load_from(store)?;
        self.wake.notify_one();
        Ok(())
    }

    /// Stop the timer task. Pending resets stay in the engine and fire on the
    /// next `check_alerts`.
    pub fn shutdown(&self) {
        if !self.timer.is_finished() {
            self.timer.abort();
            info!("AlertService stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.timer.is_finished()
    }
}

async fn run_reset_timer(engine: Arc<Mutex<AlertEngine>>, wake: Arc<Notify>, clock: ServiceClock) {
    loop {
        let next_due = engine.lock().await.next_reset_due();
        match next_due {
            Some(due_at) => {
                let delay = (due_at - clock.now_ms()).max(0) as u64;
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(delay)) => {
                        let now = clock.now_ms();
                        let rearmed = engine.lock().await.run_due_resets(now);
                        if !rearmed.is_empty() {
                            debug!(rearmed = rearmed.len(), "Cooldown resets fired");
                        }
                    }
                    _ = wake.notified() => {}
                }
            }
            None => wake.notified().await,
        }
    }
}

impl Drop for AlertService {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
