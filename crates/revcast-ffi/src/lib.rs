//! FFI boundary layer for the revcast forecasting core.
//!
//! This crate provides C-compatible functions so a host application can run
//! recursive forecasts and transform calibration with a model it owns. The
//! model is passed in as a [`RevcastModel`] callback.

pub mod allocation;
pub mod conversion;
pub mod error_handling;
pub mod model;
pub mod types;

use allocation::{alloc_and_copy_array, alloc_c_string};
use conversion::{build_dates, build_values, date_to_days, days_to_date, holiday_calendar, to_usize_or};
use error_handling::{check_null_pointers, ffi_try, set_error};
use libc::{c_char, c_int, size_t};
use model::CallbackModel;
use revcast_core::{
    BacktestOptions, DailySeries, DailyTable, ForecastConfig, ForecastError, ForecastOptions,
    ModelRegistry, Result, Target, TransformMode, TransformPolicy,
};
use revcast_core::forecast::DEFAULT_HISTORY_DAYS;
use std::ffi::{c_void, CStr};
use std::sync::Arc;

pub use types::*;

/// Column name of series passed as raw arrays.
const SERIES_COLUMN: &str = "value";

// ============================================================================
// Helper Functions
// ============================================================================

unsafe fn build_series(
    dates: *const i64,
    values: *const f64,
    validity: *const u64,
    length: size_t,
) -> Result<DailySeries> {
    let dates = build_dates(dates, length)?;
    let values = build_values(values, validity, length);
    DailySeries::from_observations(SERIES_COLUMN, &dates, &values)
}

fn transform_policy(mode: c_int, scale: f64) -> Result<TransformPolicy> {
    let mode = TransformMode::from_code(mode).ok_or_else(|| ForecastError::InvalidParameter {
        param: "transform_mode".to_string(),
        value: mode.to_string(),
        reason: "expected 0, 1, 2 or 3".to_string(),
    })?;
    TransformPolicy::new(mode, scale)
}

unsafe fn forecast_options(opts: &RevcastForecastOptions) -> Result<ForecastOptions> {
    let horizon = usize::try_from(opts.horizon).map_err(|_| ForecastError::InvalidParameter {
        param: "horizon".to_string(),
        value: opts.horizon.to_string(),
        reason: "must not be negative".to_string(),
    })?;
    let start_date = if opts.has_start_date {
        Some(days_to_date(opts.start_date)?)
    } else {
        None
    };
    let history_days = match to_usize_or(opts.history_days, DEFAULT_HISTORY_DAYS) {
        0 => DEFAULT_HISTORY_DAYS,
        n => n,
    };
    Ok(ForecastOptions {
        horizon,
        start_date,
        history_days,
        holidays: holiday_calendar(opts.holidays, opts.n_holidays, opts.holiday_window_days)?,
        clip_negative_to_zero: opts.clip_negative_to_zero,
        append_transformed: opts.append_transformed,
    })
}

unsafe fn backtest_options(opts: &RevcastBacktestOptions) -> Result<BacktestOptions> {
    let defaults = BacktestOptions::default();
    Ok(BacktestOptions {
        start: if opts.has_start_date {
            Some(days_to_date(opts.start_date)?)
        } else {
            None
        },
        end: if opts.has_end_date {
            Some(days_to_date(opts.end_date)?)
        } else {
            None
        },
        min_history: to_usize_or(opts.min_history, defaults.min_history),
        holidays: holiday_calendar(opts.holidays, opts.n_holidays, opts.holiday_window_days)?,
    })
}

unsafe fn c_str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str> {
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| ForecastError::InvalidInput(format!("{} is not valid UTF-8", name)))
}

/// Register both caller models under the target model names.
unsafe fn callback_registry(
    order_model: &RevcastModel,
    line_model: &RevcastModel,
    version: Option<&str>,
) -> Result<ModelRegistry> {
    let registry = ModelRegistry::in_memory();
    registry.insert(
        Target::Order.model_name(),
        version,
        Arc::new(CallbackModel::from_raw(order_model)?),
    )?;
    registry.insert(
        Target::Line.model_name(),
        version,
        Arc::new(CallbackModel::from_raw(line_model)?),
    )?;
    Ok(registry)
}

unsafe fn config_arg(config_json: *const c_char) -> Result<ForecastConfig> {
    if config_json.is_null() {
        Ok(ForecastConfig::default())
    } else {
        ForecastConfig::from_json_str(c_str_arg(config_json, "config_json")?)
    }
}

unsafe fn write_json(json: &str, out_json: *mut *mut c_char, out_error: *mut RevcastError) -> bool {
    let ptr = alloc_c_string(json);
    if ptr.is_null() {
        set_error(out_error, ErrorCode::AllocationError, "Memory allocation failed");
        return false;
    }
    *out_json = ptr;
    true
}

// ============================================================================
// Forecasting
// ============================================================================

/// Recursively forecast one daily series with a caller-supplied model.
///
/// `dates` are days since 1970-01-01. `validity` may be null (all values
/// valid); NULL and non-finite values are dropped.
///
/// # Safety
/// All pointer arguments except `validity` must be valid and non-null. Arrays
/// must have the specified lengths.
#[no_mangle]
pub unsafe extern "C" fn revcast_forecast(
    dates: *const i64,
    values: *const f64,
    validity: *const u64,
    length: size_t,
    model: *const RevcastModel,
    options: *const RevcastForecastOptions,
    out_result: *mut RevcastForecastResult,
    out_error: *mut RevcastError,
) -> bool {
    if check_null_pointers(
        out_error,
        &[
            dates as *const c_void,
            values as *const c_void,
            model as *const c_void,
            options as *const c_void,
            out_result as *const c_void,
        ],
    ) {
        return false;
    }

    let run = ffi_try(out_error, || {
        let series = build_series(dates, values, validity, length)?;
        let model = CallbackModel::from_raw(&*model)?;
        let opts = &*options;
        let policy = transform_policy(opts.transform_mode, opts.transform_scale)?;
        revcast_core::forecast_recursive(&series, &model, &policy, &forecast_options(opts)?)
    });
    let Some(run) = run else {
        return false;
    };

    let out = &mut *out_result;
    *out = RevcastForecastResult::default();
    let day_numbers: Vec<i64> = run.steps.iter().map(|s| date_to_days(s.date)).collect();
    if !alloc_and_copy_array(&day_numbers, &mut out.dates, out_error)
        || !alloc_and_copy_array(&run.raw(), &mut out.raw, out_error)
        || !alloc_and_copy_array(&run.calibrated(), &mut out.calibrated, out_error)
    {
        revcast_free_forecast_result(out_result);
        return false;
    }
    out.n_steps = run.len();
    out.start_date = date_to_days(run.start_date);
    out.last_observed = date_to_days(run.last_observed);
    true
}

/// Forecast both revenue targets from CSV text and return the JSON document.
///
/// `config_json` may be null for the default settings. The returned string
/// must be released with [`revcast_free_string`].
///
/// # Safety
/// All pointer arguments except `config_json` must be valid and non-null;
/// strings must be null-terminated.
#[no_mangle]
pub unsafe extern "C" fn revcast_forecast_all_json(
    csv_text: *const c_char,
    order_model: *const RevcastModel,
    line_model: *const RevcastModel,
    config_json: *const c_char,
    out_json: *mut *mut c_char,
    out_error: *mut RevcastError,
) -> bool {
    if check_null_pointers(
        out_error,
        &[
            csv_text as *const c_void,
            order_model as *const c_void,
            line_model as *const c_void,
            out_json as *const c_void,
        ],
    ) {
        return false;
    }

    let json = ffi_try(out_error, || {
        let config = config_arg(config_json)?;
        let table = DailyTable::from_csv_reader(c_str_arg(csv_text, "csv_text")?.as_bytes())?;
        let registry =
            callback_registry(&*order_model, &*line_model, config.model_version.as_deref())?;
        revcast_core::forecast_all_targets(&table, &registry, &config.request()?)?.to_json()
    });

    match json {
        Some(json) => write_json(&json, out_json, out_error),
        None => false,
    }
}

// ============================================================================
// Calibration
// ============================================================================

/// Backtest a model one step ahead and rank the candidate transforms.
///
/// # Safety
/// All pointer arguments except `validity` must be valid and non-null. Arrays
/// must have the specified lengths.
#[no_mangle]
pub unsafe extern "C" fn revcast_calibrate(
    dates: *const i64,
    values: *const f64,
    validity: *const u64,
    length: size_t,
    model: *const RevcastModel,
    options: *const RevcastBacktestOptions,
    out_result: *mut RevcastCalibrationResult,
    out_error: *mut RevcastError,
) -> bool {
    if check_null_pointers(
        out_error,
        &[
            dates as *const c_void,
            values as *const c_void,
            model as *const c_void,
            options as *const c_void,
            out_result as *const c_void,
        ],
    ) {
        return false;
    }

    let report = ffi_try(out_error, || {
        let series = build_series(dates, values, validity, length)?;
        let model = CallbackModel::from_raw(&*model)?;
        revcast_core::calibrate(&series, &model, &backtest_options(&*options)?)
    });
    let Some(report) = report else {
        return false;
    };

    let candidates = report.candidates();
    let modes: Vec<c_int> = candidates.iter().map(|c| c.policy.mode.code()).collect();
    let scales: Vec<f64> = candidates.iter().map(|c| c.policy.scale).collect();
    let mae: Vec<f64> = candidates.iter().map(|c| c.mae).collect();
    let mape: Vec<f64> = candidates.iter().map(|c| c.mape).collect();

    let out = &mut *out_result;
    *out = RevcastCalibrationResult::default();
    if !alloc_and_copy_array(&modes, &mut out.modes, out_error)
        || !alloc_and_copy_array(&scales, &mut out.scales, out_error)
        || !alloc_and_copy_array(&mae, &mut out.mae, out_error)
        || !alloc_and_copy_array(&mape, &mut out.mape, out_error)
    {
        revcast_free_calibration_result(out_result);
        return false;
    }
    out.n_candidates = candidates.len();
    out.median_ratio = report.median_ratio();
    out.n_points = report.n_points();
    true
}

/// Calibrate both revenue targets from CSV text and return the JSON reports.
///
/// The backtest window and minimum history come from the `calibration`
/// section of `config_json` (null for defaults).
///
/// # Safety
/// Same requirements as [`revcast_forecast_all_json`].
#[no_mangle]
pub unsafe extern "C" fn revcast_calibrate_all_json(
    csv_text: *const c_char,
    order_model: *const RevcastModel,
    line_model: *const RevcastModel,
    config_json: *const c_char,
    out_json: *mut *mut c_char,
    out_error: *mut RevcastError,
) -> bool {
    if check_null_pointers(
        out_error,
        &[
            csv_text as *const c_void,
            order_model as *const c_void,
            line_model as *const c_void,
            out_json as *const c_void,
        ],
    ) {
        return false;
    }

    let json = ffi_try(out_error, || {
        let config = config_arg(config_json)?;
        let table = DailyTable::from_csv_reader(c_str_arg(csv_text, "csv_text")?.as_bytes())?;
        let registry =
            callback_registry(&*order_model, &*line_model, config.model_version.as_deref())?;
        let calibration =
            revcast_core::calibrate_targets(&table, &registry, &config.calibration_request())?;
        Ok(serde_json::to_string(&calibration)?)
    });

    match json {
        Some(json) => write_json(&json, out_json, out_error),
        None => false,
    }
}

// ============================================================================
// Calendar
// ============================================================================

/// Compute the holiday-window flag for one date.
///
/// # Safety
/// `holidays` must point to `n_holidays` valid strings (or be null when
/// `n_holidays` is 0); `out_flag` must be valid.
#[no_mangle]
pub unsafe extern "C" fn revcast_holiday_flag(
    date: i64,
    holidays: *const *const c_char,
    n_holidays: size_t,
    window_days: c_int,
    out_flag: *mut c_int,
    out_error: *mut RevcastError,
) -> bool {
    if check_null_pointers(out_error, &[out_flag as *const c_void]) {
        return false;
    }

    let flag = ffi_try(out_error, || {
        let date = days_to_date(date)?;
        Ok(holiday_calendar(holidays, n_holidays, window_days)?.flag(date))
    });

    match flag {
        Some(flag) => {
            *out_flag = c_int::from(flag);
            true
        }
        None => false,
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a RevcastForecastResult.
///
/// # Safety
/// The result pointer must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn revcast_free_forecast_result(result: *mut RevcastForecastResult) {
    if result.is_null() {
        return;
    }
    let r = &mut *result;
    crate::free_fields!(r, dates, raw, calibrated);
    r.n_steps = 0;
}

/// Free a RevcastCalibrationResult.
///
/// # Safety
/// The result pointer must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn revcast_free_calibration_result(result: *mut RevcastCalibrationResult) {
    if result.is_null() {
        return;
    }
    let r = &mut *result;
    crate::free_fields!(r, modes, scales, mae, mape);
    r.n_candidates = 0;
}

/// Free a string returned by this library.
///
/// # Safety
/// The pointer must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn revcast_free_string(ptr: *mut c_char) {
    allocation::free_ptr(ptr as *mut c_void);
}

// ============================================================================
// Version
// ============================================================================

#[no_mangle]
pub extern "C" fn revcast_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
