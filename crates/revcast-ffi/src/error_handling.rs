//! Standardized error handling utilities for FFI functions.

use crate::types::{ErrorCode, RevcastError};
use revcast_core::ForecastError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Initialize error output to success state.
///
/// # Safety
/// The error pointer must be valid if non-null.
#[inline]
pub unsafe fn init_error(out_error: *mut RevcastError) {
    if !out_error.is_null() {
        *out_error = RevcastError::success();
    }
}

/// Set an error on the output error pointer.
///
/// # Safety
/// The error pointer must be valid if non-null.
#[inline]
pub unsafe fn set_error(out_error: *mut RevcastError, code: ErrorCode, message: &str) {
    if !out_error.is_null() {
        (*out_error).set_error(code, message);
    }
}

/// Check if any of the given pointers are null, and set an error if so.
///
/// # Safety
/// The error pointer must be valid if non-null.
#[inline]
pub unsafe fn check_null_pointers(
    out_error: *mut RevcastError,
    ptrs: &[*const core::ffi::c_void],
) -> bool {
    for ptr in ptrs {
        if ptr.is_null() {
            set_error(out_error, ErrorCode::NullPointer, "Null pointer argument");
            return true;
        }
    }
    false
}

/// Execute an FFI function body with standardized error handling.
///
/// Initializes the error output, catches panics and maps `ForecastError`
/// variants to their error codes.
///
/// # Safety
/// The error pointer must be valid if non-null.
///
/// # Returns
/// `Some(value)` on success, `None` on error
pub unsafe fn ffi_try<F, T>(out_error: *mut RevcastError, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, ForecastError>,
{
    init_error(out_error);

    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            set_error(out_error, ErrorCode::from(&e), &e.to_string());
            None
        }
        Err(_) => {
            set_error(out_error, ErrorCode::PanicCaught, "Panic in Rust code");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_error() {
        let mut error = RevcastError::default();
        error.set_error(ErrorCode::ModelError, "stale");
        unsafe {
            init_error(&mut error);
        }
        assert_eq!(error.code, ErrorCode::Success);
    }

    #[test]
    fn test_check_null_pointers() {
        let mut error = RevcastError::default();
        let value = 1.0_f64;
        let ok_ptr = &value as *const f64 as *const core::ffi::c_void;
        unsafe {
            assert!(!check_null_pointers(&mut error, &[ok_ptr]));
            assert!(check_null_pointers(&mut error, &[ok_ptr, std::ptr::null()]));
        }
        assert_eq!(error.code, ErrorCode::NullPointer);
    }

    #[test]
    fn test_ffi_try_success() {
        let mut error = RevcastError::default();
        let result = unsafe { ffi_try(&mut error, || Ok::<_, ForecastError>(42)) };
        assert_eq!(result, Some(42));
        assert_eq!(error.code, ErrorCode::Success);
    }

    #[test]
    fn test_ffi_try_maps_error_variant() {
        let mut error = RevcastError::default();
        let result = unsafe {
            ffi_try(&mut error, || {
                Err::<i32, _>(ForecastError::InsufficientHistory { needed: 8, got: 2 })
            })
        };
        assert_eq!(result, None);
        assert_eq!(error.code, ErrorCode::InsufficientHistory);
    }

    #[test]
    fn test_ffi_try_catches_panic() {
        let mut error = RevcastError::default();
        let result: Option<i32> = unsafe { ffi_try(&mut error, || panic!("boom")) };
        assert_eq!(result, None);
        assert_eq!(error.code, ErrorCode::PanicCaught);
    }
}
