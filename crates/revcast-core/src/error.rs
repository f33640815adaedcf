//! Error types for the revenue forecasting core.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result type for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised by the forecasting pipeline.
///
/// Each stage boundary returns one of these instead of producing partial
/// output; a failed run has to be corrected and reinvoked.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Empty history: {0}")]
    EmptyHistory(String),

    #[error("Insufficient history: need at least {needed} observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("Empty backtest: {0}")]
    EmptyBacktest(String),

    #[error("Model schema error: {0}")]
    ModelSchema(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data frame error: {0}")]
    Frame(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ForecastError {
    /// Convert to an error code for FFI.
    pub fn to_code(&self) -> i32 {
        match self {
            ForecastError::Schema(_) => 2,
            ForecastError::EmptyHistory(_) => 3,
            ForecastError::InsufficientHistory { .. } => 4,
            ForecastError::EmptyBacktest(_) => 5,
            ForecastError::ModelSchema(_) => 6,
            ForecastError::Model(_) => 7,
            ForecastError::ModelNotFound(_) => 8,
            ForecastError::InvalidInput(_) => 9,
            ForecastError::InvalidParameter { .. } => 10,
            ForecastError::InvalidDateFormat(_) => 11,
            ForecastError::Io(_) => 12,
            ForecastError::Frame(_) => 13,
            ForecastError::Json(_) => 14,
            ForecastError::InternalError(_) => 15,
        }
    }

    pub(crate) fn invalid_parameter(
        param: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ForecastError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Frame(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ForecastError::Schema("date".into()).to_code(), 2);
        assert_eq!(ForecastError::EmptyHistory("x".into()).to_code(), 3);
        assert_eq!(
            ForecastError::InsufficientHistory { needed: 8, got: 5 }.to_code(),
            4
        );
        assert_eq!(ForecastError::EmptyBacktest("x".into()).to_code(), 5);
        assert_eq!(ForecastError::ModelSchema("x".into()).to_code(), 6);
        assert_eq!(ForecastError::Model("x".into()).to_code(), 7);
        assert_eq!(ForecastError::ModelNotFound("x".into()).to_code(), 8);
        assert_eq!(ForecastError::InvalidInput("x".into()).to_code(), 9);
        assert_eq!(
            ForecastError::invalid_parameter("horizon", 0, "must be positive").to_code(),
            10
        );
        assert_eq!(ForecastError::InvalidDateFormat("x".into()).to_code(), 11);
        assert_eq!(ForecastError::Frame("x".into()).to_code(), 13);
        assert_eq!(ForecastError::InternalError("x".into()).to_code(), 15);
    }

    #[test]
    fn test_error_display() {
        let err = ForecastError::Schema("missing column `date`".into());
        assert_eq!(format!("{}", err), "Schema error: missing column `date`");

        let err = ForecastError::InsufficientHistory { needed: 8, got: 3 };
        assert_eq!(
            format!("{}", err),
            "Insufficient history: need at least 8 observations, got 3"
        );

        let err = ForecastError::invalid_parameter("transform_scale", "-1", "must be positive");
        assert_eq!(
            format!("{}", err),
            "Invalid parameter 'transform_scale' = '-1': must be positive"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ForecastError = io.into();
        assert!(matches!(err, ForecastError::Io(_)));
        assert_eq!(err.to_code(), 12);
    }
}
