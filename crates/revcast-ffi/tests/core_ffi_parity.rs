//! Core-vs-FFI parity integration tests.
//!
//! Each test runs the Rust core directly with a `LinearModel` and then calls
//! the FFI entry point with a C callback computing the same linear function.
//! Both must produce bit-identical results since the FFI layer is a thin
//! translation shim.

use std::ffi::{c_char, c_double, c_int, c_void, CStr, CString};

use chrono::{Days, NaiveDate};
use revcast_core::{
    calibrate, forecast_all_targets, forecast_recursive, BacktestOptions, DailySeries, DailyTable,
    FeatureWeight, ForecastConfig, ForecastOptions, HolidayCalendar, LinearModel, ModelRegistry,
    RevenueModel, Target, TransformMode, TransformPolicy,
};
use revcast_ffi::types::{
    ErrorCode, RevcastBacktestOptions, RevcastCalibrationResult, RevcastError,
    RevcastForecastOptions, RevcastForecastResult, RevcastModel,
};
use std::sync::Arc;

// Defined in revcast_ffi/src/lib.rs
extern "C" {
    fn revcast_forecast(
        dates: *const i64,
        values: *const f64,
        validity: *const u64,
        length: usize,
        model: *const RevcastModel,
        options: *const RevcastForecastOptions,
        out_result: *mut RevcastForecastResult,
        out_error: *mut RevcastError,
    ) -> bool;

    fn revcast_free_forecast_result(result: *mut RevcastForecastResult);

    fn revcast_calibrate(
        dates: *const i64,
        values: *const f64,
        validity: *const u64,
        length: usize,
        model: *const RevcastModel,
        options: *const RevcastBacktestOptions,
        out_result: *mut RevcastCalibrationResult,
        out_error: *mut RevcastError,
    ) -> bool;

    fn revcast_free_calibration_result(result: *mut RevcastCalibrationResult);

    fn revcast_forecast_all_json(
        csv_text: *const c_char,
        order_model: *const RevcastModel,
        line_model: *const RevcastModel,
        config_json: *const c_char,
        out_json: *mut *mut c_char,
        out_error: *mut RevcastError,
    ) -> bool;

    fn revcast_free_string(ptr: *mut c_char);

    fn revcast_holiday_flag(
        date: i64,
        holidays: *const *const c_char,
        n_holidays: usize,
        window_days: c_int,
        out_flag: *mut c_int,
        out_error: *mut RevcastError,
    ) -> bool;
}

// ── Synthetic data generators ──────────────────────────────────────────

const WEEKLY: [f64; 7] = [120.0, 100.0, 95.0, 105.0, 140.0, 180.0, 60.0];

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(offset)
}

fn epoch_days(date: NaiveDate) -> i64 {
    (date - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days()
}

/// 90 days of weekly-seasonal revenue with a gentle trend.
fn weekly_data() -> (Vec<NaiveDate>, Vec<f64>) {
    (0..90u64)
        .map(|i| {
            let trend = 1.0 + 0.002 * i as f64;
            let noise = ((i * 7 + 3) % 11) as f64 * 0.5 - 2.5; // deterministic "noise"
            (day(i), WEEKLY[(i % 7) as usize] * trend + noise)
        })
        .unzip()
}

// ── Linear callback model ──────────────────────────────────────────────

struct Linear {
    names: Vec<CString>,
    name_ptrs: Vec<*const c_char>,
    intercept: f64,
    weights: Vec<f64>,
}

impl Linear {
    fn new(intercept: f64, terms: &[(&str, f64)]) -> Box<Self> {
        let names: Vec<CString> = terms.iter().map(|(n, _)| CString::new(*n).unwrap()).collect();
        let name_ptrs = names.iter().map(|s| s.as_ptr()).collect();
        Box::new(Self {
            names,
            name_ptrs,
            intercept,
            weights: terms.iter().map(|(_, w)| *w).collect(),
        })
    }

    fn core(&self) -> LinearModel {
        LinearModel::new(
            self.intercept,
            self.names
                .iter()
                .zip(&self.weights)
                .map(|(n, w)| FeatureWeight {
                    feature: n.to_str().unwrap().to_string(),
                    weight: *w,
                })
                .collect(),
        )
    }

    fn raw(&self) -> RevcastModel {
        RevcastModel {
            feature_names: self.name_ptrs.as_ptr(),
            n_features: self.name_ptrs.len(),
            predict: Some(linear_predict),
            user_data: self as *const Linear as *mut c_void,
        }
    }
}

unsafe extern "C" fn linear_predict(
    user_data: *mut c_void,
    features: *const c_double,
    n_features: usize,
    out_value: *mut c_double,
) -> bool {
    let model = &*(user_data as *const Linear);
    if n_features != model.weights.len() {
        return false;
    }
    let x = std::slice::from_raw_parts(features, n_features);
    let dot: f64 = model.weights.iter().zip(x).map(|(w, x)| w * x).sum();
    *out_value = model.intercept + dot;
    true
}

fn order_model() -> Box<Linear> {
    Linear::new(
        2.0,
        &[
            ("lag_7", 0.6),
            ("roll_mean_7", 0.35),
            ("is_weekend", 4.0),
            ("is_holiday_window", -3.0),
        ],
    )
}

fn line_model() -> Box<Linear> {
    Linear::new(1.0, &[("lag_1", 0.2), ("lag_7", 0.5), ("roll_mean_28", 0.25)])
}

// ── Helpers ────────────────────────────────────────────────────────────

/// Assert two f64 slices are bit-identical.
fn assert_f64_slices_eq(label: &str, core: &[f64], ffi: &[f64]) {
    assert_eq!(core.len(), ffi.len(), "{label} length mismatch");
    for (i, (c, f)) in core.iter().zip(ffi.iter()).enumerate() {
        assert_eq!(c.to_bits(), f.to_bits(), "{label}[{i}] mismatch: core={c} ffi={f}");
    }
}

fn error_message(error: &RevcastError) -> String {
    unsafe { CStr::from_ptr(error.message.as_ptr()) }
        .to_str()
        .unwrap_or("unknown")
        .to_string()
}

struct FfiForecast {
    dates: Vec<i64>,
    raw: Vec<f64>,
    calibrated: Vec<f64>,
    start_date: i64,
    last_observed: i64,
}

fn call_forecast(
    dates: &[NaiveDate],
    values: &[f64],
    model: &RevcastModel,
    opts: &RevcastForecastOptions,
) -> Result<FfiForecast, RevcastError> {
    let days: Vec<i64> = dates.iter().map(|d| epoch_days(*d)).collect();
    let mut result = RevcastForecastResult::default();
    let mut error = RevcastError::default();

    let ok = unsafe {
        revcast_forecast(
            days.as_ptr(),
            values.as_ptr(),
            std::ptr::null(),
            values.len(),
            model,
            opts,
            &mut result,
            &mut error,
        )
    };
    if !ok {
        return Err(error);
    }

    let n = result.n_steps;
    let output = unsafe {
        FfiForecast {
            dates: std::slice::from_raw_parts(result.dates, n).to_vec(),
            raw: std::slice::from_raw_parts(result.raw, n).to_vec(),
            calibrated: std::slice::from_raw_parts(result.calibrated, n).to_vec(),
            start_date: result.start_date,
            last_observed: result.last_observed,
        }
    };
    unsafe { revcast_free_forecast_result(&mut result) };
    assert!(result.dates.is_null());
    Ok(output)
}

// ── Parity tests ───────────────────────────────────────────────────────

fn run_forecast_parity(policy: TransformPolicy, append_transformed: bool) {
    let (dates, values) = weekly_data();
    let linear = order_model();

    let holidays = [CString::new("01-01").unwrap(), CString::new("03-31").unwrap()];
    let holiday_ptrs: Vec<*const c_char> = holidays.iter().map(|s| s.as_ptr()).collect();

    // ── Core call ──
    let series = DailySeries::from_observations(
        "value",
        &dates,
        &values.iter().map(|v| Some(*v)).collect::<Vec<_>>(),
    )
    .unwrap();
    let core_opts = ForecastOptions {
        horizon: 21,
        holidays: HolidayCalendar::new(&["01-01", "03-31"], 3),
        append_transformed,
        ..Default::default()
    };
    let core = forecast_recursive(&series, &linear.core(), &policy, &core_opts).unwrap();

    // ── FFI call ──
    let ffi_opts = RevcastForecastOptions {
        horizon: 21,
        holidays: holiday_ptrs.as_ptr(),
        n_holidays: holiday_ptrs.len(),
        holiday_window_days: 3,
        append_transformed,
        transform_mode: policy.mode.code(),
        transform_scale: policy.scale,
        ..Default::default()
    };
    let ffi = call_forecast(&dates, &values, &linear.raw(), &ffi_opts)
        .unwrap_or_else(|e| panic!("FFI call failed: {}", error_message(&e)));

    // ── Compare ──
    let core_days: Vec<i64> = core.dates().into_iter().map(epoch_days).collect();
    assert_eq!(core_days, ffi.dates);
    assert_f64_slices_eq("raw", &core.raw(), &ffi.raw);
    assert_f64_slices_eq("calibrated", &core.calibrated(), &ffi.calibrated);
    assert_eq!(ffi.start_date, epoch_days(core.start_date));
    assert_eq!(ffi.last_observed, epoch_days(day(89)));
}

#[test]
fn parity_forecast_identity() {
    run_forecast_parity(TransformPolicy::identity(), true);
}

#[test]
fn parity_forecast_scaled_raw_history() {
    let policy = TransformPolicy::new(TransformMode::IdentityScaled, 1.7).unwrap();
    run_forecast_parity(policy, false);
}

#[test]
fn parity_forecast_explicit_start_date() {
    let (dates, values) = weekly_data();
    let linear = order_model();
    let start = day(60);

    let series = DailySeries::from_observations(
        "value",
        &dates,
        &values.iter().map(|v| Some(*v)).collect::<Vec<_>>(),
    )
    .unwrap();
    let core_opts = ForecastOptions {
        horizon: 10,
        start_date: Some(start),
        ..Default::default()
    };
    let core = forecast_recursive(&series, &linear.core(), &TransformPolicy::identity(), &core_opts)
        .unwrap();

    let ffi_opts = RevcastForecastOptions {
        horizon: 10,
        start_date: epoch_days(start),
        has_start_date: true,
        ..Default::default()
    };
    let ffi = call_forecast(&dates, &values, &linear.raw(), &ffi_opts).unwrap();

    assert_eq!(ffi.start_date, epoch_days(start));
    assert_eq!(ffi.dates[0], epoch_days(start));
    assert_f64_slices_eq("raw", &core.raw(), &ffi.raw);
    assert_f64_slices_eq("calibrated", &core.calibrated(), &ffi.calibrated);
}

#[test]
fn parity_calibration() {
    let (dates, values) = weekly_data();
    let linear = line_model();
    let days: Vec<i64> = dates.iter().map(|d| epoch_days(*d)).collect();

    let series = DailySeries::from_observations(
        "value",
        &dates,
        &values.iter().map(|v| Some(*v)).collect::<Vec<_>>(),
    )
    .unwrap();
    let core_opts = BacktestOptions {
        start: Some(day(30)),
        ..Default::default()
    };
    let core = calibrate(&series, &linear.core(), &core_opts).unwrap();

    let ffi_opts = RevcastBacktestOptions {
        start_date: epoch_days(day(30)),
        has_start_date: true,
        ..Default::default()
    };
    let mut result = RevcastCalibrationResult::default();
    let mut error = RevcastError::default();
    let ok = unsafe {
        revcast_calibrate(
            days.as_ptr(),
            values.as_ptr(),
            std::ptr::null(),
            values.len(),
            &linear.raw(),
            &ffi_opts,
            &mut result,
            &mut error,
        )
    };
    assert!(ok, "FFI call failed: {}", error_message(&error));

    let n = result.n_candidates;
    assert_eq!(n, core.candidates().len());
    assert_eq!(result.n_points, core.n_points());
    assert_eq!(result.median_ratio.to_bits(), core.median_ratio().to_bits());

    let (modes, scales, mape) = unsafe {
        (
            std::slice::from_raw_parts(result.modes, n).to_vec(),
            std::slice::from_raw_parts(result.scales, n).to_vec(),
            std::slice::from_raw_parts(result.mape, n).to_vec(),
        )
    };
    let core_modes: Vec<c_int> = core.candidates().iter().map(|c| c.policy.mode.code()).collect();
    let core_scales: Vec<f64> = core.candidates().iter().map(|c| c.policy.scale).collect();
    let core_mape: Vec<f64> = core.candidates().iter().map(|c| c.mape).collect();
    assert_eq!(modes, core_modes);
    assert_f64_slices_eq("scales", &core_scales, &scales);
    assert_f64_slices_eq("mape", &core_mape, &mape);

    unsafe { revcast_free_calibration_result(&mut result) };
    assert!(result.modes.is_null());
}

#[test]
fn parity_multi_target_json() {
    let (dates, values) = weekly_data();
    let line_values: Vec<f64> = values.iter().map(|v| v * 0.4).collect();
    let order = order_model();
    let line = line_model();

    let mut csv_text = String::from("date,daily_revenue_order,daily_revenue_line\n");
    for ((d, o), l) in dates.iter().zip(&values).zip(&line_values) {
        csv_text.push_str(&format!("{},{},{}\n", d, o, l));
    }
    let config_json = r#"{"horizon": 14, "holidays": ["01-01"], "holiday_window_days": 2,
        "line_transform": {"mode": "identity_scaled", "scale": 1.25}}"#;

    // ── Core call ──
    let table = DailyTable::from_csv_reader(csv_text.as_bytes()).unwrap();
    let registry = ModelRegistry::in_memory();
    registry
        .insert(Target::Order.model_name(), None, Arc::new(order.core()))
        .unwrap();
    registry
        .insert(Target::Line.model_name(), None, Arc::new(line.core()))
        .unwrap();
    let config = ForecastConfig::from_json_str(config_json).unwrap();
    let core_json = forecast_all_targets(&table, &registry, &config.request().unwrap())
        .unwrap()
        .to_json()
        .unwrap();

    // ── FFI call ──
    let csv_c = CString::new(csv_text).unwrap();
    let config_c = CString::new(config_json).unwrap();
    let mut out_json: *mut c_char = std::ptr::null_mut();
    let mut error = RevcastError::default();
    let ok = unsafe {
        revcast_forecast_all_json(
            csv_c.as_ptr(),
            &order.raw(),
            &line.raw(),
            config_c.as_ptr(),
            &mut out_json,
            &mut error,
        )
    };
    assert!(ok, "FFI call failed: {}", error_message(&error));

    let ffi_json = unsafe { CStr::from_ptr(out_json) }.to_str().unwrap().to_string();
    unsafe { revcast_free_string(out_json) };
    assert_eq!(core_json, ffi_json);

    let parsed: serde_json::Value = serde_json::from_str(&ffi_json).unwrap();
    assert_eq!(parsed["forecast"].as_array().unwrap().len(), 14);
    assert_eq!(parsed["debug"]["start_date_used"], "2024-03-31");
}

#[test]
fn parity_holiday_flag() {
    let holidays = [CString::new("12-25").unwrap()];
    let ptrs: Vec<*const c_char> = holidays.iter().map(|s| s.as_ptr()).collect();
    let calendar = HolidayCalendar::new(&["12-25"], 3);

    for offset in 0..20u64 {
        let date = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap() + Days::new(offset);
        let mut flag: c_int = -1;
        let mut error = RevcastError::default();
        let ok = unsafe {
            revcast_holiday_flag(
                epoch_days(date),
                ptrs.as_ptr(),
                ptrs.len(),
                3,
                &mut flag,
                &mut error,
            )
        };
        assert!(ok);
        assert_eq!(flag, c_int::from(calendar.flag(date)), "{date}");
    }
}

// ── Error propagation ─────────────────────────────────────────────────

#[test]
fn short_history_maps_to_error_code() {
    let (dates, values) = weekly_data();
    let linear = order_model();
    let err = call_forecast(
        &dates[..5],
        &values[..5],
        &linear.raw(),
        &RevcastForecastOptions::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.code, ErrorCode::InsufficientHistory);
    assert!(error_message(&err).contains("at least 8"));
}

#[test]
fn invalid_transform_mode_is_rejected() {
    let (dates, values) = weekly_data();
    let linear = order_model();
    let opts = RevcastForecastOptions {
        transform_mode: 9,
        ..Default::default()
    };
    let err = call_forecast(&dates, &values, &linear.raw(), &opts).err().unwrap();
    assert_eq!(err.code, ErrorCode::InvalidParameter);
}

#[test]
fn null_model_is_rejected() {
    let (dates, values) = weekly_data();
    let days: Vec<i64> = dates.iter().map(|d| epoch_days(*d)).collect();
    let mut result = RevcastForecastResult::default();
    let mut error = RevcastError::default();
    let ok = unsafe {
        revcast_forecast(
            days.as_ptr(),
            values.as_ptr(),
            std::ptr::null(),
            values.len(),
            std::ptr::null(),
            &RevcastForecastOptions::default(),
            &mut result,
            &mut error,
        )
    };
    assert!(!ok);
    assert_eq!(error.code, ErrorCode::NullPointer);
}

#[test]
fn model_expectations_match_core() {
    let linear = order_model();
    assert_eq!(
        linear.core().expected_feature_names(),
        &["lag_7", "roll_mean_7", "is_weekend", "is_holiday_window"]
    );
}
