//! Dedicated compute worker thread
//!
//! Batch computations run on one OS thread named `compute-worker`, reached
//! only through channels. The thread announces `READY`, then answers messages
//! strictly in arrival order until the inbound channel closes. A panic inside
//! one computation is answered as an `ERROR` for that request; the thread keeps
//! serving.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use types::errors::AnalyticsError;

use super::handler::process;
use super::protocol::{parse_request, RequestEnvelope, RequestId, WorkerResponse};
use crate::metrics::WorkerMetrics;

/// Name of the worker thread.
pub const WORKER_THREAD_NAME: &str = "compute-worker";

/// Configuration for the compute worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Inbound queue depth before senders wait.
    pub queue_capacity: usize,
    /// Outbound queue depth before the worker waits for the reader.
    pub response_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            response_capacity: 256,
        }
    }
}

/// Inbound message: an already parsed request or a raw JSON line.
///
/// Raw lines are parsed on the worker thread so that parse errors are
/// answered in the same order as every other message.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Request(RequestEnvelope),
    Json(String),
}

/// Handle to a running worker thread.
pub struct ComputeWorker {
    requests: mpsc::Sender<WorkerMessage>,
    responses: mpsc::Receiver<WorkerResponse>,
    metrics: Arc<WorkerMetrics>,
    thread: thread::JoinHandle<()>,
}

impl ComputeWorker {
    /// Start the worker thread.
    pub fn spawn(config: &WorkerConfig) -> io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (response_tx, response_rx) = mpsc::channel(config.response_capacity.max(1));
        let metrics = Arc::new(WorkerMetrics::new());

        let thread_metrics = metrics.clone();
        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(request_rx, response_tx, thread_metrics))?;

        info!(
            queue_capacity = config.queue_capacity,
            response_capacity = config.response_capacity,
            "Compute worker spawned"
        );
        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            metrics,
            thread,
        })
    }

    pub fn sender(&self) -> mpsc::Sender<WorkerMessage> {
        self.requests.clone()
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        self.metrics.clone()
    }

    /// Split into the inbound sender, the response receiver and the thread handle.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Sender<WorkerMessage>,
        mpsc::Receiver<WorkerResponse>,
        thread::JoinHandle<()>,
    ) {
        (self.requests, self.responses, self.thread)
    }

    /// Send from a synchronous context.
    pub fn blocking_send(&self, message: WorkerMessage) -> Result<(), WorkerMessage> {
        self.requests.blocking_send(message).map_err(|err| err.0)
    }

    /// Next response from a synchronous context.
    pub fn blocking_recv(&mut self) -> Option<WorkerResponse> {
        self.responses.blocking_recv()
    }

    pub async fn send(&self, message: WorkerMessage) -> Result<(), WorkerMessage> {
        self.requests.send(message).await.map_err(|err| err.0)
    }

    pub async fn recv(&mut self) -> Option<WorkerResponse> {
        self.responses.recv().await
    }
}

fn run(
    mut requests: mpsc::Receiver<WorkerMessage>,
    responses: mpsc::Sender<WorkerResponse>,
    metrics: Arc<WorkerMetrics>,
) {
    if responses.blocking_send(WorkerResponse::Ready).is_err() {
        return;
    }
    debug!("Compute worker ready");

    while let Some(message) = requests.blocking_recv() {
        let started = Instant::now();
        let response = match message {
            WorkerMessage::Request(envelope) => process_guarded(envelope),
            WorkerMessage::Json(line) => match parse_request(&line) {
                Ok(envelope) => process_guarded(envelope),
                Err(rejected) => WorkerResponse::error(rejected.id, &rejected.error),
            },
        };

        match &response {
            WorkerResponse::Error { id: None, payload } => {
                metrics.record_malformed();
                warn!(error = %payload.message, "Rejected unattributable message");
            }
            WorkerResponse::Error { id: Some(id), payload } => {
                metrics.record_failure();
                warn!(request_id = %id, error = %payload.message, "Request failed");
            }
            other => {
                let elapsed_us = started.elapsed().as_micros() as u64;
                metrics.record_success(elapsed_us);
                debug!(
                    request_id = other.id().unwrap_or_default(),
                    response = other.type_tag(),
                    elapsed_us,
                    "Request completed"
                );
            }
        }

        if responses.blocking_send(response).is_err() {
            debug!("Response receiver dropped, stopping worker");
            break;
        }
    }

    info!(
        processed = metrics.requests_processed.load(std::sync::atomic::Ordering::Relaxed),
        "Compute worker stopped"
    );
}

fn process_guarded(envelope: RequestEnvelope) -> WorkerResponse {
    let id = envelope.id.clone();
    guarded(id, move || process(envelope))
}

/// Run `compute`, converting a panic into an `ERROR` response for `id`.
fn guarded<F>(id: RequestId, compute: F) -> WorkerResponse
where
    F: FnOnce() -> WorkerResponse,
{
    panic::catch_unwind(AssertUnwindSafe(compute)).unwrap_or_else(|cause| {
        let reason = cause
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| cause.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(request_id = %id, reason = %reason, "Computation panicked");
        WorkerResponse::error(
            Some(id),
            &AnalyticsError::InvalidInput(format!("computation panicked: {}", reason)),
        )
    })
}
