//! Compute isolation boundary
//!
//! Contains the JSON wire protocol, the stateless request handler, the
//! dedicated worker thread and the async client that fronts it.

pub mod client;
pub mod handler;
pub mod protocol;
pub mod runtime;

pub use client::{ComputeClient, ComputeClientError};
pub use handler::{handle_request, process, process_line};
pub use protocol::{
    parse_request, ComputeRequest, CorrelationRequest, ErrorPayload, IndicatorsRequest, MultiTimeframeRequest,
    RejectedRequest, RequestEnvelope, RequestId, RequestKind, WorkerResponse,
};
pub use runtime::{ComputeWorker, WorkerConfig, WorkerMessage, WORKER_THREAD_NAME};
