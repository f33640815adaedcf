//! Order-level and line-level revenue forecasts on one shared calendar.
//!
//! Both targets are forecast from the same table with their own model,
//! history window and transform. The start date is resolved once from the
//! order target and reused for the line target so the rows align.

use crate::calibration::{calibrate, BacktestOptions, CalibrationReport, DEFAULT_MIN_HISTORY};
use crate::error::{ForecastError, Result};
use crate::forecast::{forecast_recursive, ForecastOptions, ForecastRun, ForecastStep};
use crate::holiday::HolidayCalendar;
use crate::registry::ModelRegistry;
use crate::table::{DailySeries, DailyTable};
use crate::transform::{TransformMode, TransformPolicy};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// A forecastable revenue series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Order,
    Line,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Order, Target::Line];

    /// Column holding the target's history.
    pub fn column(&self) -> &'static str {
        match self {
            Target::Order => "daily_revenue_order",
            Target::Line => "daily_revenue_line",
        }
    }

    /// Name the target's model is registered under.
    pub fn model_name(&self) -> &'static str {
        self.column()
    }
}

impl FromStr for Target {
    type Err = ForecastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "daily_revenue_order" | "order" => Ok(Target::Order),
            "daily_revenue_line" | "line" => Ok(Target::Line),
            other => Err(ForecastError::invalid_parameter(
                "target",
                other,
                "must be daily_revenue_order or daily_revenue_line",
            )),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Parameters of a two-target forecast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiTargetRequest {
    /// Shared run options; `start_date` applies to the order target
    pub options: ForecastOptions,
    pub order_policy: TransformPolicy,
    pub line_policy: TransformPolicy,
    pub model_version: Option<String>,
}

/// One aligned output row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub pred_order_raw: f64,
    pub pred_order: f64,
    pub pred_line_raw: f64,
    pub pred_line: f64,
}

/// What the run actually used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDebug {
    pub last_date_in_file: NaiveDate,
    pub start_date_used: NaiveDate,
    pub expected_features_order: Vec<String>,
    pub expected_features_line: Vec<String>,
    pub order_transform_mode: TransformMode,
    pub order_transform_scale: f64,
    pub line_transform_mode: TransformMode,
    pub line_transform_scale: f64,
    pub append_transformed_to_history: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTargetForecast {
    pub debug: ForecastDebug,
    pub forecast: Vec<ForecastRow>,
}

impl MultiTargetForecast {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Forecast both revenue targets and join them by date.
///
/// # Errors
/// Any error of either target run; nothing is returned for the other target.
pub fn forecast_all_targets(
    table: &DailyTable,
    registry: &ModelRegistry,
    request: &MultiTargetRequest,
) -> Result<MultiTargetForecast> {
    let version = request.model_version.as_deref();
    let order_model = registry.get(Target::Order.model_name(), version)?;
    let line_model = registry.get(Target::Line.model_name(), version)?;

    let order_series = DailySeries::from_table(table, Target::Order.column())?;
    let order = forecast_recursive(
        &order_series,
        order_model.as_ref(),
        &request.order_policy,
        &request.options,
    )?;

    let line_series = DailySeries::from_table(table, Target::Line.column())?;
    let line_options = ForecastOptions {
        start_date: Some(order.start_date),
        ..request.options.clone()
    };
    let line = forecast_recursive(
        &line_series,
        line_model.as_ref(),
        &request.line_policy,
        &line_options,
    )?;

    let forecast = join_rows(&order, &line)?;

    info!(
        start = %order.start_date,
        rows = forecast.len(),
        "multi-target forecast complete"
    );

    Ok(MultiTargetForecast {
        debug: ForecastDebug {
            last_date_in_file: order.last_observed,
            start_date_used: order.start_date,
            expected_features_order: order.expected_features,
            expected_features_line: line.expected_features,
            order_transform_mode: request.order_policy.mode,
            order_transform_scale: request.order_policy.scale,
            line_transform_mode: request.line_policy.mode,
            line_transform_scale: request.line_policy.scale,
            append_transformed_to_history: request.options.append_transformed,
        },
        forecast,
    })
}

fn join_rows(order: &ForecastRun, line: &ForecastRun) -> Result<Vec<ForecastRow>> {
    if order.len() != line.len() {
        return Err(ForecastError::InternalError(format!(
            "target runs differ in length: {} vs {}",
            order.len(),
            line.len()
        )));
    }
    order
        .steps
        .iter()
        .zip(&line.steps)
        .map(|(o, l)| {
            if o.date != l.date {
                return Err(ForecastError::InternalError(format!(
                    "target runs are misaligned at {} vs {}",
                    o.date, l.date
                )));
            }
            Ok(ForecastRow {
                date: o.date,
                pred_order_raw: o.raw,
                pred_order: o.calibrated,
                pred_line_raw: l.raw,
                pred_line: l.calibrated,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleTargetDebug {
    pub target: Target,
    pub model: String,
    pub last_date_in_file: NaiveDate,
    pub start_date_used: NaiveDate,
    pub expected_features: Vec<String>,
    pub transform_mode: TransformMode,
    pub transform_scale: f64,
    pub append_transformed_to_history: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleTargetForecast {
    pub debug: SingleTargetDebug,
    pub forecast: Vec<ForecastStep>,
}

/// Forecast a single revenue target.
pub fn forecast_one_target(
    table: &DailyTable,
    registry: &ModelRegistry,
    target: Target,
    options: &ForecastOptions,
    policy: &TransformPolicy,
    model_version: Option<&str>,
) -> Result<SingleTargetForecast> {
    let model = registry.get(target.model_name(), model_version)?;
    let series = DailySeries::from_table(table, target.column())?;
    let run = forecast_recursive(&series, model.as_ref(), policy, options)?;

    Ok(SingleTargetForecast {
        debug: SingleTargetDebug {
            target,
            model: target.model_name().to_string(),
            last_date_in_file: run.last_observed,
            start_date_used: run.start_date,
            expected_features: run.expected_features,
            transform_mode: policy.mode,
            transform_scale: policy.scale,
            append_transformed_to_history: options.append_transformed,
        },
        forecast: run.steps,
    })
}

/// Parameters of a two-target calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRequest {
    /// Backtest window is `[last - trailing_days, last]`
    pub trailing_days: u64,
    pub min_history: usize,
    pub holidays: HolidayCalendar,
    pub model_version: Option<String>,
}

impl Default for CalibrationRequest {
    fn default() -> Self {
        Self {
            trailing_days: 60,
            min_history: DEFAULT_MIN_HISTORY,
            holidays: HolidayCalendar::empty(),
            model_version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTargetCalibration {
    pub order: CalibrationReport,
    pub line: CalibrationReport,
}

impl MultiTargetCalibration {
    /// Best (order, line) policies.
    pub fn recommended(&self) -> (TransformPolicy, TransformPolicy) {
        (self.order.best().policy, self.line.best().policy)
    }
}

/// Calibrate both targets over a trailing window ending at each target's
/// last observation.
pub fn calibrate_targets(
    table: &DailyTable,
    registry: &ModelRegistry,
    request: &CalibrationRequest,
) -> Result<MultiTargetCalibration> {
    let version = request.model_version.as_deref();
    let mut reports = Vec::with_capacity(Target::ALL.len());
    for target in Target::ALL {
        let model = registry.get(target.model_name(), version)?;
        let series = DailySeries::from_table(table, target.column())?;
        let options = BacktestOptions {
            min_history: request.min_history,
            holidays: request.holidays.clone(),
            ..BacktestOptions::trailing(&series, request.trailing_days)?
        };
        reports.push(calibrate(&series, model.as_ref(), &options)?);
    }

    let line = reports.pop();
    let order = reports.pop();
    match (order, line) {
        (Some(order), Some(line)) => Ok(MultiTargetCalibration { order, line }),
        _ => Err(ForecastError::InternalError(
            "calibration produced fewer reports than targets".to_string(),
        )),
    }
}
