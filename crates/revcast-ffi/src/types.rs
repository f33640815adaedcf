//! C-compatible type definitions for the FFI boundary.
//!
//! Dates cross the boundary as days since 1970-01-01. Arrays returned in
//! result structs are allocated with `malloc` and released by the matching
//! `revcast_free_*` function.

use libc::{c_char, c_double, c_int, c_void, size_t};
use revcast_core::ForecastError;

/// Error codes for the FFI boundary.
///
/// Codes 2 through 15 match `ForecastError::to_code()`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    NullPointer = 1,
    SchemaError = 2,
    EmptyHistory = 3,
    InsufficientHistory = 4,
    EmptyBacktest = 5,
    ModelSchemaError = 6,
    ModelError = 7,
    ModelNotFound = 8,
    InvalidInput = 9,
    InvalidParameter = 10,
    InvalidDateFormat = 11,
    IoError = 12,
    FrameError = 13,
    JsonError = 14,
    InternalError = 15,
    AllocationError = 16,
    PanicCaught = 17,
}

impl From<&ForecastError> for ErrorCode {
    fn from(e: &ForecastError) -> Self {
        match e.to_code() {
            2 => ErrorCode::SchemaError,
            3 => ErrorCode::EmptyHistory,
            4 => ErrorCode::InsufficientHistory,
            5 => ErrorCode::EmptyBacktest,
            6 => ErrorCode::ModelSchemaError,
            7 => ErrorCode::ModelError,
            8 => ErrorCode::ModelNotFound,
            9 => ErrorCode::InvalidInput,
            10 => ErrorCode::InvalidParameter,
            11 => ErrorCode::InvalidDateFormat,
            12 => ErrorCode::IoError,
            13 => ErrorCode::FrameError,
            14 => ErrorCode::JsonError,
            _ => ErrorCode::InternalError,
        }
    }
}

/// Error structure with message buffer for FFI.
#[repr(C)]
#[derive(Debug)]
pub struct RevcastError {
    pub code: ErrorCode,
    pub message: [c_char; 256],
}

impl RevcastError {
    /// Create a success error (no error).
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: [0; 256],
        }
    }

    /// Set an error with code and message.
    pub fn set_error(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        let bytes = msg.as_bytes();
        let len = bytes.len().min(255);
        for (i, &b) in bytes[..len].iter().enumerate() {
            self.message[i] = b as c_char;
        }
        self.message[len] = 0; // Null terminator
    }
}

impl Default for RevcastError {
    fn default() -> Self {
        Self::success()
    }
}

/// Prediction callback.
///
/// Receives the feature values in the order of `RevcastModel::feature_names`
/// and writes one raw prediction to `out_value`. Returns false on failure.
pub type RevcastPredictFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    features: *const c_double,
    n_features: size_t,
    out_value: *mut c_double,
) -> bool;

/// A model implemented by the caller.
#[repr(C)]
pub struct RevcastModel {
    /// Expected feature names (null-terminated strings)
    pub feature_names: *const *const c_char,
    pub n_features: size_t,
    pub predict: Option<RevcastPredictFn>,
    /// Passed through to `predict` unchanged
    pub user_data: *mut c_void,
}

/// Recursive forecast options.
#[repr(C)]
pub struct RevcastForecastOptions {
    /// Forecast horizon in days
    pub horizon: c_int,
    /// First forecast date (days since epoch), used when `has_start_date`
    pub start_date: i64,
    pub has_start_date: bool,
    /// History lookback in observations (<= 0 = 365)
    pub history_days: c_int,
    /// Recurring holidays as "MM-DD" strings
    pub holidays: *const *const c_char,
    pub n_holidays: size_t,
    pub holiday_window_days: c_int,
    pub clip_negative_to_zero: bool,
    pub append_transformed: bool,
    /// 0 identity, 1 log-inverse, 2 identity-scaled, 3 log-inverse-scaled
    pub transform_mode: c_int,
    pub transform_scale: c_double,
}

impl Default for RevcastForecastOptions {
    fn default() -> Self {
        Self {
            horizon: 30,
            start_date: 0,
            has_start_date: false,
            history_days: 365,
            holidays: std::ptr::null(),
            n_holidays: 0,
            holiday_window_days: 3,
            clip_negative_to_zero: true,
            append_transformed: true,
            transform_mode: 0,
            transform_scale: 1.0,
        }
    }
}

/// Recursive forecast result.
#[repr(C)]
pub struct RevcastForecastResult {
    /// Forecast dates (days since epoch)
    pub dates: *mut i64,
    /// Model output before the transform
    pub raw: *mut c_double,
    /// Transformed, possibly clipped predictions
    pub calibrated: *mut c_double,
    pub n_steps: size_t,
    pub start_date: i64,
    pub last_observed: i64,
}

impl Default for RevcastForecastResult {
    fn default() -> Self {
        Self {
            dates: std::ptr::null_mut(),
            raw: std::ptr::null_mut(),
            calibrated: std::ptr::null_mut(),
            n_steps: 0,
            start_date: 0,
            last_observed: 0,
        }
    }
}

/// Backtest options.
#[repr(C)]
pub struct RevcastBacktestOptions {
    /// First evaluated date (days since epoch), used when `has_start_date`
    pub start_date: i64,
    pub has_start_date: bool,
    /// Last evaluated date (days since epoch), used when `has_end_date`
    pub end_date: i64,
    pub has_end_date: bool,
    /// Prior observations a date needs (< 0 = 28)
    pub min_history: c_int,
    pub holidays: *const *const c_char,
    pub n_holidays: size_t,
    pub holiday_window_days: c_int,
}

impl Default for RevcastBacktestOptions {
    fn default() -> Self {
        Self {
            start_date: 0,
            has_start_date: false,
            end_date: 0,
            has_end_date: false,
            min_history: 28,
            holidays: std::ptr::null(),
            n_holidays: 0,
            holiday_window_days: 3,
        }
    }
}

/// Ranked calibration candidates, lowest MAPE first.
#[repr(C)]
pub struct RevcastCalibrationResult {
    /// Transform mode codes
    pub modes: *mut c_int,
    pub scales: *mut c_double,
    pub mae: *mut c_double,
    /// MAPE as a fraction
    pub mape: *mut c_double,
    pub n_candidates: size_t,
    pub median_ratio: c_double,
    pub n_points: size_t,
}

impl Default for RevcastCalibrationResult {
    fn default() -> Self {
        Self {
            modes: std::ptr::null_mut(),
            scales: std::ptr::null_mut(),
            mae: std::ptr::null_mut(),
            mape: std::ptr::null_mut(),
            n_candidates: 0,
            median_ratio: f64::NAN,
            n_points: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_matches_core_codes() {
        let cases = [
            (ForecastError::Schema("x".into()), ErrorCode::SchemaError),
            (
                ForecastError::InsufficientHistory { needed: 8, got: 1 },
                ErrorCode::InsufficientHistory,
            ),
            (ForecastError::EmptyBacktest("x".into()), ErrorCode::EmptyBacktest),
            (ForecastError::Model("x".into()), ErrorCode::ModelError),
            (ForecastError::InternalError("x".into()), ErrorCode::InternalError),
        ];
        for (err, code) in cases {
            assert_eq!(ErrorCode::from(&err), code);
            assert_eq!(code as i32, err.to_code());
        }
    }

    #[test]
    fn test_set_error_truncates() {
        let mut error = RevcastError::default();
        error.set_error(ErrorCode::InvalidInput, &"x".repeat(400));
        assert_eq!(error.code, ErrorCode::InvalidInput);
        assert_eq!(error.message[255], 0);
        assert_eq!(error.message[254], b'x' as c_char);
    }
}
