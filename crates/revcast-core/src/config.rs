//! Run configuration read from JSON.
//!
//! Every field is optional; missing fields take the defaults below.
//!
//! ```json
//! {
//!   "horizon": 14,
//!   "start_date": "2024-07-01",
//!   "holidays": ["01-01", "12-25"],
//!   "holiday_window_days": 3,
//!   "order_transform": {"mode": "expm1_scale", "scale": 1.2},
//!   "calibration": {"trailing_days": 90}
//! }
//! ```

use crate::calendar::parse_date;
use crate::calibration::DEFAULT_MIN_HISTORY;
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastOptions, DEFAULT_HISTORY_DAYS};
use crate::holiday::HolidayCalendar;
use crate::orchestrator::{CalibrationRequest, MultiTargetRequest};
use crate::transform::TransformPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Backtest settings for automatic calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub trailing_days: u64,
    pub min_history: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            trailing_days: 60,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }
}

/// Settings of a forecasting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon: usize,
    /// First forecast date; the day after the last observation when absent
    pub start_date: Option<String>,
    pub history_days: usize,
    /// Recurring holidays as "MM-DD"
    pub holidays: Vec<String>,
    pub holiday_window_days: u32,
    pub clip_negative_to_zero: bool,
    pub append_transformed: bool,
    pub order_transform: TransformPolicy,
    pub line_transform: TransformPolicy,
    pub model_version: Option<String>,
    pub calibration: CalibrationConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            start_date: None,
            history_days: DEFAULT_HISTORY_DAYS,
            holidays: Vec::new(),
            holiday_window_days: 3,
            clip_negative_to_zero: true,
            append_transformed: true,
            order_transform: TransformPolicy::default(),
            line_transform: TransformPolicy::default(),
            model_version: None,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::invalid_parameter(
                "horizon",
                self.horizon,
                "must be at least 1",
            ));
        }
        if self.history_days == 0 {
            return Err(ForecastError::invalid_parameter(
                "history_days",
                self.history_days,
                "must be at least 1",
            ));
        }
        self.order_transform.validate()?;
        self.line_transform.validate()?;
        self.start_date()?;
        Ok(())
    }

    /// The parsed start date, if one is configured.
    pub fn start_date(&self) -> Result<Option<chrono::NaiveDate>> {
        self.start_date
            .as_deref()
            .map(|s| parse_date(s).ok_or_else(|| ForecastError::InvalidDateFormat(s.to_string())))
            .transpose()
    }

    pub fn holiday_calendar(&self) -> HolidayCalendar {
        HolidayCalendar::new(&self.holidays, self.holiday_window_days)
    }

    pub fn to_options(&self) -> Result<ForecastOptions> {
        Ok(ForecastOptions {
            horizon: self.horizon,
            start_date: self.start_date()?,
            history_days: self.history_days,
            holidays: self.holiday_calendar(),
            clip_negative_to_zero: self.clip_negative_to_zero,
            append_transformed: self.append_transformed,
        })
    }

    pub fn request(&self) -> Result<MultiTargetRequest> {
        Ok(MultiTargetRequest {
            options: self.to_options()?,
            order_policy: self.order_transform,
            line_policy: self.line_transform,
            model_version: self.model_version.clone(),
        })
    }

    pub fn calibration_request(&self) -> CalibrationRequest {
        CalibrationRequest {
            trailing_days: self.calibration.trailing_days,
            min_history: self.calibration.min_history,
            holidays: self.holiday_calendar(),
            model_version: self.model_version.clone(),
        }
    }
}
