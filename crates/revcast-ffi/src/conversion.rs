//! Parameter conversion utilities for FFI functions.
//!
//! Dates cross the boundary as days since 1970-01-01; negative integer
//! parameters select the documented default.

use chrono::{Days, NaiveDate};
use libc::{c_char, c_double, c_int, size_t};
use revcast_core::{ForecastError, HolidayCalendar, Result};
use std::ffi::CStr;

/// 1970-01-01
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Convert days since epoch to a date.
pub fn days_to_date(days: i64) -> Result<NaiveDate> {
    let delta = Days::new(days.unsigned_abs());
    let date = if days >= 0 {
        epoch().checked_add_days(delta)
    } else {
        epoch().checked_sub_days(delta)
    };
    date.ok_or_else(|| ForecastError::InvalidDateFormat(format!("{} days since epoch", days)))
}

/// Convert a date to days since epoch.
#[inline]
pub fn date_to_days(date: NaiveDate) -> i64 {
    (date - epoch()).num_days()
}

/// Convert a `c_int` to `usize`, where negative values become `default`.
#[inline]
pub fn to_usize_or(value: c_int, default: usize) -> usize {
    usize::try_from(value).unwrap_or(default)
}

/// Copy an array of C strings.
///
/// # Safety
/// `ptr` must be null (only when `n` is 0) or point to `n` valid
/// null-terminated strings.
pub unsafe fn c_str_array_to_vec(ptr: *const *const c_char, n: size_t) -> Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(ForecastError::InvalidInput(format!(
            "null string array with {} entries",
            n
        )));
    }
    std::slice::from_raw_parts(ptr, n)
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            if s.is_null() {
                return Err(ForecastError::InvalidInput(format!("string {} is null", i)));
            }
            CStr::from_ptr(s)
                .to_str()
                .map(str::to_string)
                .map_err(|_| ForecastError::InvalidInput(format!("string {} is not UTF-8", i)))
        })
        .collect()
}

/// Build a holiday calendar from C strings; a negative window means 0.
///
/// # Safety
/// Same requirements as [`c_str_array_to_vec`].
pub unsafe fn holiday_calendar(
    holidays: *const *const c_char,
    n_holidays: size_t,
    window_days: c_int,
) -> Result<HolidayCalendar> {
    let names = c_str_array_to_vec(holidays, n_holidays)?;
    let window = u32::try_from(window_days).unwrap_or(0);
    Ok(HolidayCalendar::new(&names, window))
}

/// Build a series with NULL handling from raw pointers.
///
/// # Safety
/// `values` must point to `length` doubles; `validity` must be null (all
/// valid) or point to `length.div_ceil(64)` words.
pub unsafe fn build_values(
    values: *const c_double,
    validity: *const u64,
    length: size_t,
) -> Vec<Option<f64>> {
    let data = std::slice::from_raw_parts(values, length);

    if validity.is_null() {
        data.iter().map(|&v| Some(v)).collect()
    } else {
        let words = std::slice::from_raw_parts(validity, length.div_ceil(64));
        (0..length)
            .map(|i| {
                let is_valid = (words[i / 64] >> (i % 64)) & 1 == 1;
                if is_valid {
                    Some(data[i])
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Convert a days-since-epoch array to dates.
///
/// # Safety
/// `dates` must point to `length` values.
pub unsafe fn build_dates(dates: *const i64, length: size_t) -> Result<Vec<NaiveDate>> {
    std::slice::from_raw_parts(dates, length)
        .iter()
        .map(|&d| days_to_date(d))
        .collect()
}
