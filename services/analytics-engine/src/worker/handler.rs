//! Request dispatch
//!
//! Stateless: each request is computed from its own payload only. Any
//! failure becomes an `ERROR` response carrying the request id.

use std::collections::BTreeMap;

use indicators::correlation::correlation_matrix;
use indicators::suite::{compute_core_set, compute_suite};
use types::errors::AnalyticsError;

use super::protocol::{parse_request, ComputeRequest, RequestEnvelope, RequestId, WorkerResponse};

/// Compute the response for one request.
pub fn handle_request(id: RequestId, request: &ComputeRequest) -> Result<WorkerResponse, AnalyticsError> {
    match request {
        ComputeRequest::CalculateIndicators(req) => Ok(WorkerResponse::Indicators {
            id,
            payload: compute_suite(&req.data, &req.params)?,
        }),
        ComputeRequest::CalculateCorrelation(req) => Ok(WorkerResponse::Correlation {
            id,
            payload: correlation_matrix(&req.symbols, &req.data)?,
        }),
        ComputeRequest::CalculateMultiTimeframe(req) => {
            let payload = req
                .data
                .iter()
                .map(|(timeframe, candles)| Ok((timeframe.clone(), compute_core_set(candles)?)))
                .collect::<Result<BTreeMap<_, _>, AnalyticsError>>()?;
            Ok(WorkerResponse::MultiTimeframe { id, payload })
        }
    }
}

/// Answer a parsed request, converting failures into `ERROR`.
pub fn process(envelope: RequestEnvelope) -> WorkerResponse {
    let RequestEnvelope { id, request } = envelope;
    handle_request(id.clone(), &request).unwrap_or_else(|err| WorkerResponse::error(Some(id), &err))
}

/// Answer one raw JSON line.
pub fn process_line(line: &str) -> WorkerResponse {
    match parse_request(line) {
        Ok(envelope) => process(envelope),
        Err(rejected) => WorkerResponse::error(rejected.id, &rejected.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::protocol::{CorrelationRequest, IndicatorsRequest, MultiTimeframeRequest};
    use indicators::suite::SuiteParams;
    use types::candle::Candle;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = 100.0 + ((i * 7) % 13) as f64;
                Candle::new(i as i64 * 60, close, close + 1.0, close - 1.0, close, 5.0)
            })
            .collect()
    }

    #[test]
    fn test_indicators_request() {
        let envelope = RequestEnvelope::new(
            "a",
            ComputeRequest::CalculateIndicators(IndicatorsRequest {
                data: candles(60),
                params: SuiteParams::default(),
            }),
        );
        match process(envelope) {
            WorkerResponse::Indicators { id, payload } => {
                assert_eq!(id, "a");
                assert_eq!(payload.rsi.len(), 60 - 14);
                assert_eq!(payload.macd.len(), 60 - 26 - 9 + 2);
                assert_eq!(payload.bb.len(), 60 - 20 + 1);
                assert_eq!(payload.atr.len(), 60 - 14);
                assert_eq!(payload.ema.len(), 60 - 20 + 1);
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_insufficient_data_becomes_error() {
        let envelope = RequestEnvelope::new(
            "short",
            ComputeRequest::CalculateIndicators(IndicatorsRequest {
                data: candles(5),
                params: SuiteParams::default(),
            }),
        );
        let response = process(envelope);
        assert!(response.is_error());
        assert_eq!(response.id(), Some("short"));
    }

    #[test]
    fn test_correlation_request_with_missing_symbol() {
        let mut data = BTreeMap::new();
        data.insert("BTC".to_string(), (0..20).map(|i| i as f64).collect());
        let envelope = RequestEnvelope::new(
            "c",
            ComputeRequest::CalculateCorrelation(CorrelationRequest {
                symbols: vec!["BTC".to_string(), "ETH".to_string()],
                data,
            }),
        );
        match process(envelope) {
            WorkerResponse::Correlation { payload, .. } => {
                assert_eq!(payload.len(), 4);
                assert_eq!(payload["BTC-BTC"], 1.0);
                assert_eq!(payload["ETH-ETH"], 1.0);
                assert_eq!(payload["BTC-ETH"], 0.0);
                assert_eq!(payload["ETH-BTC"], 0.0);
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_multi_timeframe_request() {
        let mut data = BTreeMap::new();
        data.insert("1m".to_string(), candles(50));
        data.insert("5m".to_string(), candles(40));
        let envelope = RequestEnvelope::new(
            "m",
            ComputeRequest::CalculateMultiTimeframe(MultiTimeframeRequest { data }),
        );
        match process(envelope) {
            WorkerResponse::MultiTimeframe { payload, .. } => {
                assert_eq!(payload["1m"].rsi.len(), 50 - 14);
                assert_eq!(payload["5m"].ema.len(), 40 - 20 + 1);
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_process_line_errors() {
        let unknown = process_line(r#"{"type":"NOPE","id":"u","payload":{}}"#);
        assert_eq!(unknown.id(), Some("u"));
        assert!(unknown.is_error());

        let malformed = process_line("not json");
        assert_eq!(malformed.id(), None);
        assert!(malformed.is_error());
    }
}
