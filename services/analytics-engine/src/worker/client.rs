//! Async client for the compute worker
//!
//! Assigns request ids, keeps a pending map of id → reply channel and runs a
//! router task that matches worker responses back to their callers. Callers
//! never block on computation; they await a oneshot.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use indicators::suite::{CoreIndicatorSet, IndicatorSuite, SuiteParams};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use types::candle::Candle;

use super::protocol::{
    ComputeRequest, CorrelationRequest, IndicatorsRequest, MultiTimeframeRequest, RequestEnvelope, RequestId,
    WorkerResponse,
};
use super::runtime::{ComputeWorker, WorkerConfig, WorkerMessage};
use crate::metrics::WorkerMetrics;

#[derive(Debug, thiserror::Error)]
pub enum ComputeClientError {
    #[error("failed to spawn compute worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("compute worker is gone")]
    WorkerGone,

    #[error("compute worker error ({code}): {message}")]
    Remote { code: String, message: String },

    #[error("unexpected response type {0}")]
    UnexpectedResponse(&'static str),
}

type Pending = Arc<Mutex<HashMap<RequestId, oneshot::Sender<WorkerResponse>>>>;

pub struct ComputeClient {
    requests: mpsc::Sender<WorkerMessage>,
    pending: Pending,
    next_id: AtomicU64,
    ready: watch::Receiver<bool>,
    metrics: Arc<WorkerMetrics>,
    router: JoinHandle<()>,
}

impl ComputeClient {
    /// Spawn a worker thread and the response router.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &WorkerConfig) -> Result<Self, ComputeClientError> {
        let worker = ComputeWorker::spawn(config)?;
        let metrics = worker.metrics();
        let (requests, responses, _thread) = worker.into_parts();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (ready_tx, ready_rx) = watch::channel(false);
        let router = tokio::spawn(route_responses(responses, pending.clone(), ready_tx));

        Ok(Self {
            requests,
            pending,
            next_id: AtomicU64::new(1),
            ready: ready_rx,
            metrics,
            router,
        })
    }

    /// Wait for the worker's READY announcement.
    pub async fn wait_ready(&self) -> Result<(), ComputeClientError> {
        let mut ready = self.ready.clone();
        ready
            .wait_for(|is_ready| *is_ready)
            .await
            .map(|_| ())
            .map_err(|_| ComputeClientError::WorkerGone)
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        self.metrics.clone()
    }

    /// Send a request and await its response, which may be an `ERROR`.
    pub async fn request(&self, request: ComputeRequest) -> Result<WorkerResponse, ComputeClientError> {
        let id = format!("req-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ComputeClientError::WorkerGone)?
            .insert(id.clone(), tx);

        debug!(request_id = %id, request = request.kind().as_str(), "Dispatching compute request");
        let message = WorkerMessage::Request(RequestEnvelope::new(id.clone(), request));
        if self.requests.send(message).await.is_err() {
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&id);
            }
            return Err(ComputeClientError::WorkerGone);
        }

        rx.await.map_err(|_| ComputeClientError::WorkerGone)
    }

    pub async fn calculate_indicators(
        &self,
        data: Vec<Candle>,
        params: SuiteParams,
    ) -> Result<IndicatorSuite, ComputeClientError> {
        let request = ComputeRequest::CalculateIndicators(IndicatorsRequest { data, params });
        match self.request(request).await? {
            WorkerResponse::Indicators { payload, .. } => Ok(payload),
            other => Err(unexpected(other)),
        }
    }

    pub async fn calculate_correlation(
        &self,
        symbols: Vec<String>,
        data: BTreeMap<String, Vec<f64>>,
    ) -> Result<BTreeMap<String, f64>, ComputeClientError> {
        let request = ComputeRequest::CalculateCorrelation(CorrelationRequest { symbols, data });
        match self.request(request).await? {
            WorkerResponse::Correlation { payload, .. } => Ok(payload),
            other => Err(unexpected(other)),
        }
    }

    pub async fn calculate_multi_timeframe(
        &self,
        data: BTreeMap<String, Vec<Candle>>,
    ) -> Result<BTreeMap<String, CoreIndicatorSet>, ComputeClientError> {
        let request = ComputeRequest::CalculateMultiTimeframe(MultiTimeframeRequest { data });
        match self.request(request).await? {
            WorkerResponse::MultiTimeframe { payload, .. } => Ok(payload),
            other => Err(unexpected(other)),
        }
    }

    /// Requests sent but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or_default()
    }
}

impl Drop for ComputeClient {
    fn drop(&mut self) {
        self.router.abort();
    }
}

fn unexpected(response: WorkerResponse) -> ComputeClientError {
    match response {
        WorkerResponse::Error { payload, .. } => ComputeClientError::Remote {
            code: payload.code.unwrap_or_default(),
            message: payload.message,
        },
        other => ComputeClientError::UnexpectedResponse(other.type_tag()),
    }
}

async fn route_responses(
    mut responses: mpsc::Receiver<WorkerResponse>,
    pending: Pending,
    ready: watch::Sender<bool>,
) {
    while let Some(response) = responses.recv().await {
        let Some(id) = response.id().map(str::to_string) else {
            match response {
                WorkerResponse::Ready => {
                    let _ = ready.send(true);
                }
                other => warn!(response = other.type_tag(), "Dropping unattributable worker response"),
            }
            continue;
        };

        let waiter = pending.lock().ok().and_then(|mut p| p.remove(&id));
        match waiter {
            Some(tx) => {
                if tx.send(response).is_err() {
                    debug!(request_id = %id, "Caller stopped waiting");
                }
            }
            None => warn!(request_id = %id, "Response for unknown request"),
        }
    }

    // Worker gone: fail every waiter.
    if let Ok(mut pending) = pending.lock() {
        pending.clear();
    }
    debug!("Compute response router stopped");
}
