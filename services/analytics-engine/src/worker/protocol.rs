//! Compute worker wire protocol
//!
//! Requests arrive as `{type, payload, id}`. Responses echo the id and are
//! tagged `<REQUEST>_RESULT` or `ERROR`; a single `READY` without id is sent
//! before the first request is processed.
//!
//! Requests are a closed set; parsing checks the `type` tag before the
//! payload so an unknown type is reported as such, not as a payload error.

use std::collections::BTreeMap;

use indicators::suite::{CoreIndicatorSet, IndicatorSuite, SuiteParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::candle::Candle;
use types::errors::AnalyticsError;

/// Client-assigned request id, echoed on the response.
pub type RequestId = String;

/// Request type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    CalculateIndicators,
    CalculateCorrelation,
    CalculateMultiTimeframe,
}

impl RequestKind {
    pub fn parse(tag: &str) -> Result<Self, AnalyticsError> {
        match tag {
            "CALCULATE_INDICATORS" => Ok(RequestKind::CalculateIndicators),
            "CALCULATE_CORRELATION" => Ok(RequestKind::CalculateCorrelation),
            "CALCULATE_MULTI_TIMEFRAME" => Ok(RequestKind::CalculateMultiTimeframe),
            other => Err(AnalyticsError::UnknownRequestType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::CalculateIndicators => "CALCULATE_INDICATORS",
            RequestKind::CalculateCorrelation => "CALCULATE_CORRELATION",
            RequestKind::CalculateMultiTimeframe => "CALCULATE_MULTI_TIMEFRAME",
        }
    }
}

/// `CALCULATE_INDICATORS` payload: candles plus optional period overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorsRequest {
    pub data: Vec<Candle>,
    #[serde(flatten)]
    pub params: SuiteParams,
}

/// `CALCULATE_CORRELATION` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRequest {
    pub symbols: Vec<String>,
    pub data: BTreeMap<String, Vec<f64>>,
}

/// `CALCULATE_MULTI_TIMEFRAME` payload: timeframe → candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTimeframeRequest {
    pub data: BTreeMap<String, Vec<Candle>>,
}

/// Every request the worker understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputeRequest {
    CalculateIndicators(IndicatorsRequest),
    CalculateCorrelation(CorrelationRequest),
    CalculateMultiTimeframe(MultiTimeframeRequest),
}

impl ComputeRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ComputeRequest::CalculateIndicators(_) => RequestKind::CalculateIndicators,
            ComputeRequest::CalculateCorrelation(_) => RequestKind::CalculateCorrelation,
            ComputeRequest::CalculateMultiTimeframe(_) => RequestKind::CalculateMultiTimeframe,
        }
    }

    /// Decode the payload of a request whose tag is `kind`.
    pub fn from_payload(kind: RequestKind, payload: Value) -> Result<Self, AnalyticsError> {
        let invalid = |err: serde_json::Error| {
            AnalyticsError::InvalidInput(format!("invalid {} payload: {}", kind.as_str(), err))
        };
        Ok(match kind {
            RequestKind::CalculateIndicators => {
                ComputeRequest::CalculateIndicators(serde_json::from_value(payload).map_err(invalid)?)
            }
            RequestKind::CalculateCorrelation => {
                ComputeRequest::CalculateCorrelation(serde_json::from_value(payload).map_err(invalid)?)
            }
            RequestKind::CalculateMultiTimeframe => {
                ComputeRequest::CalculateMultiTimeframe(serde_json::from_value(payload).map_err(invalid)?)
            }
        })
    }
}

/// A request with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub id: RequestId,
    pub request: ComputeRequest,
}

impl RequestEnvelope {
    pub fn new(id: impl Into<RequestId>, request: ComputeRequest) -> Self {
        Self {
            id: id.into(),
            request,
        }
    }

    /// Wire form `{type, payload, id}`.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(&self.request)?;
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        Ok(value)
    }
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    id: Option<Value>,
}

/// Parse failure that still carries whatever id could be recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRequest {
    pub id: Option<RequestId>,
    pub error: AnalyticsError,
}

/// Parse one JSON request line.
pub fn parse_request(line: &str) -> Result<RequestEnvelope, RejectedRequest> {
    let value: Value = serde_json::from_str(line).map_err(|err| RejectedRequest {
        id: None,
        error: AnalyticsError::InvalidInput(format!("malformed request: {}", err)),
    })?;

    let raw: RawRequest = serde_json::from_value(value).map_err(|err| RejectedRequest {
        id: None,
        error: AnalyticsError::InvalidInput(format!("malformed request: {}", err)),
    })?;

    let id = raw.id.and_then(|id| match id {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    let reject = |error| RejectedRequest { id: id.clone(), error };
    let kind = RequestKind::parse(&raw.kind).map_err(reject)?;
    let request = ComputeRequest::from_payload(kind, raw.payload).map_err(reject)?;
    let id = id.ok_or_else(|| RejectedRequest {
        id: None,
        error: AnalyticsError::InvalidInput("request id is required".to_string()),
    })?;

    Ok(RequestEnvelope { id, request })
}

/// `ERROR` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Machine-readable error code, e.g. `INSUFFICIENT_DATA`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&AnalyticsError> for ErrorPayload {
    fn from(err: &AnalyticsError) -> Self {
        Self {
            message: err.to_string(),
            stack: None,
            code: Some(err.code().to_string()),
        }
    }
}

/// Every message the worker emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerResponse {
    #[serde(rename = "READY")]
    Ready,

    #[serde(rename = "CALCULATE_INDICATORS_RESULT")]
    Indicators { id: RequestId, payload: IndicatorSuite },

    #[serde(rename = "CALCULATE_CORRELATION_RESULT")]
    Correlation {
        id: RequestId,
        payload: BTreeMap<String, f64>,
    },

    #[serde(rename = "CALCULATE_MULTI_TIMEFRAME_RESULT")]
    MultiTimeframe {
        id: RequestId,
        payload: BTreeMap<String, CoreIndicatorSet>,
    },

    #[serde(rename = "ERROR")]
    Error {
        id: Option<RequestId>,
        payload: ErrorPayload,
    },
}

impl WorkerResponse {
    pub fn error(id: Option<RequestId>, err: &AnalyticsError) -> Self {
        WorkerResponse::Error {
            id,
            payload: ErrorPayload::from(err),
        }
    }

    /// Id of the request this answers; `None` for READY and unattributable errors.
    pub fn id(&self) -> Option<&str> {
        match self {
            WorkerResponse::Ready => None,
            WorkerResponse::Indicators { id, .. }
            | WorkerResponse::Correlation { id, .. }
            | WorkerResponse::MultiTimeframe { id, .. } => Some(id),
            WorkerResponse::Error { id, .. } => id.as_deref(),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            WorkerResponse::Ready => "READY",
            WorkerResponse::Indicators { .. } => "CALCULATE_INDICATORS_RESULT",
            WorkerResponse::Correlation { .. } => "CALCULATE_CORRELATION_RESULT",
            WorkerResponse::MultiTimeframe { .. } => "CALCULATE_MULTI_TIMEFRAME_RESULT",
            WorkerResponse::Error { .. } => "ERROR",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, WorkerResponse::Error { .. })
    }
}
