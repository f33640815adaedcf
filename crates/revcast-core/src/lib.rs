//! Core library for autoregressive daily revenue forecasting.
//!
//! This crate derives calendar and lag features for each future day, feeds
//! them to an externally trained model, and steps forward one day at a time.
//! It also backtests candidate output transforms to correct models trained on
//! a different scale.

pub mod calendar;
pub mod calibration;
pub mod config;
pub mod error;
pub mod features;
pub mod forecast;
pub mod history;
pub mod holiday;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod table;
pub mod transform;

// Re-exports for convenience
pub use calendar::{normalize_calendar, parse_date, CalendarFeatures, Season};
pub use calibration::{
    backtest_one_step, calibrate, candidate_policies, evaluate_candidates, BacktestOptions,
    BacktestPoint, CalibrationReport, CandidateScore,
};
pub use config::{CalibrationConfig, ForecastConfig};
pub use error::{ForecastError, Result};
pub use features::{synthesize_row, FeatureKind, FeatureSchema, FeatureVector};
pub use forecast::{
    forecast_recursive, predict_single, resolve_start_date, ForecastOptions, ForecastRun,
    ForecastStep, SinglePrediction, MIN_HISTORY,
};
pub use history::HistoryWindow;
pub use holiday::{holiday_flag, HolidayCalendar};
pub use metrics::{mae, mape, median, rmse};
pub use model::{FeatureWeight, FnModel, LinearModel, RevenueModel};
pub use orchestrator::{
    calibrate_targets, forecast_all_targets, forecast_one_target, CalibrationRequest,
    ForecastDebug, ForecastRow, MultiTargetCalibration, MultiTargetForecast, MultiTargetRequest,
    SingleTargetDebug, SingleTargetForecast, Target,
};
pub use registry::{JsonModelLoader, ModelLoader, ModelRegistry};
pub use table::{DailySeries, DailyTable};
pub use transform::{TransformMode, TransformPolicy};
