//! Error types for the analytics engine
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Top-level analytics error.
///
/// Every computation checks its preconditions up front and reports one of
/// these variants instead of producing partial or NaN-laden output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Insufficient data: required {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),
}

impl AnalyticsError {
    /// Shorthand for the length precondition shared by every windowed indicator.
    pub fn require_len(actual: usize, required: usize) -> Result<(), AnalyticsError> {
        if actual < required {
            return Err(AnalyticsError::InsufficientData { required, actual });
        }
        Ok(())
    }

    /// Length precondition for `period + extra` points.
    ///
    /// A period so large that the requirement overflows `usize` can never be
    /// satisfied and is reported as invalid input.
    pub fn require_window(actual: usize, period: usize, extra: usize) -> Result<(), AnalyticsError> {
        let required = period.checked_add(extra).ok_or_else(|| {
            AnalyticsError::InvalidInput(format!("window of {} + {} points overflows", period, extra))
        })?;
        Self::require_len(actual, required)
    }

    /// Stable machine-readable code, used at the compute-protocol boundary.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyticsError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            AnalyticsError::InvalidInput(_) => "INVALID_INPUT",
            AnalyticsError::InvalidConfig(_) => "INVALID_CONFIG",
            AnalyticsError::UnknownRequestType(_) => "UNKNOWN_REQUEST_TYPE",
        }
    }
}
