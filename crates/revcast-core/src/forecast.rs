//! Autoregressive daily forecasting.
//!
//! Each step builds the feature row for the next date from the current
//! history, asks the model for a raw value, applies the output transform and
//! feeds the result back into the history before moving one day forward.

use crate::error::{ForecastError, Result};
use crate::features::{synthesize_row, FeatureSchema, FeatureVector};
use crate::history::HistoryWindow;
use crate::holiday::HolidayCalendar;
use crate::model::RevenueModel;
use crate::table::DailySeries;
use crate::transform::TransformPolicy;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Fewest observations before the start date a run accepts.
pub const MIN_HISTORY: usize = 8;

/// Default lookback of the history window, in observations.
pub const DEFAULT_HISTORY_DAYS: usize = 365;

/// Forecast options.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOptions {
    /// Number of future days
    pub horizon: usize,
    /// First forecast date; `None` means the day after the last observation
    pub start_date: Option<NaiveDate>,
    /// Maximum number of observations kept in the history window
    pub history_days: usize,
    pub holidays: HolidayCalendar,
    /// Replace negative calibrated values with zero
    pub clip_negative_to_zero: bool,
    /// Feed calibrated (true) or raw (false) predictions back into history
    pub append_transformed: bool,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            horizon: 30,
            start_date: None,
            history_days: DEFAULT_HISTORY_DAYS,
            holidays: HolidayCalendar::empty(),
            clip_negative_to_zero: true,
            append_transformed: true,
        }
    }
}

/// One forecast day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastStep {
    pub date: NaiveDate,
    /// Model output before the transform
    pub raw: f64,
    /// Transformed (and possibly clipped) value
    pub calibrated: f64,
}

/// Result of one recursive forecast run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRun {
    pub steps: Vec<ForecastStep>,
    pub expected_features: Vec<String>,
    /// Expected names that were zero-filled
    pub passthrough_features: Vec<String>,
    pub last_observed: NaiveDate,
    pub start_date: NaiveDate,
    pub policy: TransformPolicy,
    /// Observations in the history window at the start of the run
    pub history_used: usize,
}

impl ForecastRun {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.steps.iter().map(|s| s.date).collect()
    }

    pub fn raw(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.raw).collect()
    }

    pub fn calibrated(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.calibrated).collect()
    }
}

/// The explicit start date, or the day after the last observation.
pub fn resolve_start_date(series: &DailySeries, start_date: Option<NaiveDate>) -> Result<NaiveDate> {
    if let Some(d) = start_date {
        return Ok(d);
    }
    let last = series.last_date().ok_or_else(|| {
        ForecastError::EmptyHistory(format!("column `{}` has no observations", series.column()))
    })?;
    last.succ_opt()
        .ok_or_else(|| ForecastError::InvalidInput(format!("no day follows {}", last)))
}

/// Forecast `options.horizon` days by feeding predictions back into history.
///
/// The history window holds at most `options.history_days` observations
/// strictly before the start date. A model failure aborts the run.
///
/// # Errors
/// - [`ForecastError::InvalidParameter`] for a zero horizon or an invalid policy
/// - [`ForecastError::ModelSchema`] if the model declares no features
/// - [`ForecastError::EmptyHistory`] if nothing precedes the start date
/// - [`ForecastError::InsufficientHistory`] if fewer than [`MIN_HISTORY`] points do
/// - [`ForecastError::Model`] if the model fails, returns a non-finite value,
///   or the transform overflows
pub fn forecast_recursive(
    series: &DailySeries,
    model: &dyn RevenueModel,
    policy: &TransformPolicy,
    options: &ForecastOptions,
) -> Result<ForecastRun> {
    if options.horizon == 0 {
        return Err(ForecastError::invalid_parameter(
            "horizon",
            options.horizon,
            "must be at least 1",
        ));
    }
    policy.validate()?;

    let schema = FeatureSchema::resolve(model.expected_feature_names())?;
    let passthrough: Vec<String> = schema
        .passthrough_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !passthrough.is_empty() {
        warn!(
            column = series.column(),
            features = ?passthrough,
            "model expects features that are not derived here; filling with 0"
        );
    }

    let start = resolve_start_date(series, options.start_date)?;
    let last_observed = series.last_date().ok_or_else(|| {
        ForecastError::EmptyHistory(format!("column `{}` has no observations", series.column()))
    })?;

    let mut history = HistoryWindow::from_series_before(series, start, options.history_days);
    if history.is_empty() {
        return Err(ForecastError::EmptyHistory(format!(
            "no `{}` observations before {}",
            series.column(),
            start
        )));
    }
    if history.len() < MIN_HISTORY {
        return Err(ForecastError::InsufficientHistory {
            needed: MIN_HISTORY,
            got: history.len(),
        });
    }
    let history_used = history.len();

    debug!(
        column = series.column(),
        start = %start,
        horizon = options.horizon,
        history = history_used,
        policy = %policy,
        "starting recursive forecast"
    );

    let mut steps = Vec::with_capacity(options.horizon);
    let mut date = start;
    for step in 0..options.horizon {
        if step > 0 {
            date = date
                .succ_opt()
                .ok_or_else(|| ForecastError::InvalidInput(format!("no day follows {}", date)))?;
        }

        let row = synthesize_row(&schema, history.values(), date, &options.holidays);
        let raw = model.predict(&row)?;
        if !raw.is_finite() {
            return Err(ForecastError::Model(format!(
                "non-finite prediction {} for {}",
                raw, date
            )));
        }

        let calibrated = calibrate(raw, policy, options.clip_negative_to_zero)
            .ok_or_else(|| non_finite_calibration(raw, policy, &date.to_string()))?;

        let feedback = if options.append_transformed {
            calibrated
        } else {
            raw
        };
        history.push(date, feedback);

        debug!(date = %date, raw = raw, calibrated = calibrated, "forecast step");
        steps.push(ForecastStep {
            date,
            raw,
            calibrated,
        });
    }

    info!(
        column = series.column(),
        start = %start,
        rows = steps.len(),
        "recursive forecast complete"
    );

    Ok(ForecastRun {
        steps,
        expected_features: schema.names().to_vec(),
        passthrough_features: passthrough,
        last_observed,
        start_date: start,
        policy: *policy,
        history_used,
    })
}

/// Transform and clip a raw value; `None` if the result is not finite.
fn calibrate(raw: f64, policy: &TransformPolicy, clip_negative_to_zero: bool) -> Option<f64> {
    let mut calibrated = policy.apply(raw);
    if clip_negative_to_zero && calibrated < 0.0 {
        calibrated = 0.0;
    }
    calibrated.is_finite().then_some(calibrated)
}

fn non_finite_calibration(raw: f64, policy: &TransformPolicy, at: &str) -> ForecastError {
    ForecastError::Model(format!(
        "transform {} maps raw {} to a non-finite value for {}",
        policy, raw, at
    ))
}

/// A single-day prediction from caller-supplied feature values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SinglePrediction {
    pub raw: f64,
    pub calibrated: f64,
    pub policy: TransformPolicy,
}

/// Predict one day from a name to value map.
///
/// Values are aligned to the model's expected names; names absent from
/// `features` are zero and extra entries are ignored.
pub fn predict_single(
    model: &dyn RevenueModel,
    features: &HashMap<String, f64>,
    policy: &TransformPolicy,
    clip_negative_to_zero: bool,
) -> Result<SinglePrediction> {
    policy.validate()?;
    let schema = FeatureSchema::resolve(model.expected_feature_names())?;
    let row = FeatureVector::aligned(&schema, |name| features.get(name).copied());

    let raw = model.predict(&row)?;
    if !raw.is_finite() {
        return Err(ForecastError::Model(format!("non-finite prediction {}", raw)));
    }
    let calibrated = calibrate(raw, policy, clip_negative_to_zero)
        .ok_or_else(|| non_finite_calibration(raw, policy, "single prediction"))?;
    Ok(SinglePrediction {
        raw,
        calibrated,
        policy: *policy,
    })
}
