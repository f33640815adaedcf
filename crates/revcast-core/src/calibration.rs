//! Backtest-driven selection of the output transform.
//!
//! A model trained on `log1p(revenue)` or with a multiplicative bias produces
//! raw values on the wrong scale. The calibrator replays one-step-ahead
//! predictions over observed days, using only real history before each day,
//! and ranks a fixed set of candidate transforms by MAPE.

use crate::error::{ForecastError, Result};
use crate::features::{synthesize_row, FeatureSchema};
use crate::holiday::HolidayCalendar;
use crate::metrics;
use crate::model::RevenueModel;
use crate::table::DailySeries;
use crate::transform::{TransformMode, TransformPolicy};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

/// Fixed scale tried alongside the median ratio.
pub const FIXED_SCALE: f64 = 3.0;

/// Default number of prior observations a backtest date needs.
pub const DEFAULT_MIN_HISTORY: usize = 28;

/// Backtest options.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOptions {
    /// First evaluated date (inclusive); `None` means the first observation
    pub start: Option<NaiveDate>,
    /// Last evaluated date (inclusive); `None` means the last observation
    pub end: Option<NaiveDate>,
    /// Dates with fewer prior observations are skipped
    pub min_history: usize,
    pub holidays: HolidayCalendar,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            min_history: DEFAULT_MIN_HISTORY,
            holidays: HolidayCalendar::empty(),
        }
    }
}

impl BacktestOptions {
    /// Window `[last - days, last]` ending at the last observation.
    pub fn trailing(series: &DailySeries, days: u64) -> Result<Self> {
        let end = series.last_date().ok_or_else(|| {
            ForecastError::EmptyHistory(format!("column `{}` has no observations", series.column()))
        })?;
        let start = end
            .checked_sub_days(Days::new(days))
            .ok_or_else(|| ForecastError::invalid_parameter("trailing_days", days, "out of range"))?;
        Ok(Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        })
    }
}

/// One backtested day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestPoint {
    pub date: NaiveDate,
    pub actual: f64,
    pub raw: f64,
    /// `actual / raw`
    pub ratio: f64,
}

/// Replay one-step-ahead raw predictions over observed days.
///
/// The history for each date is every observation strictly before it, never
/// earlier predictions. Pairs whose raw value is near zero or whose ratio is
/// not finite are dropped.
///
/// # Errors
/// [`ForecastError::EmptyBacktest`] if no observation lies in the window or
/// no valid pair remains.
pub fn backtest_one_step(
    series: &DailySeries,
    model: &dyn RevenueModel,
    options: &BacktestOptions,
) -> Result<Vec<BacktestPoint>> {
    let schema = FeatureSchema::resolve(model.expected_feature_names())?;
    let dates = series.dates();
    let values = series.values();

    let in_window = |d: &NaiveDate| {
        options.start.map_or(true, |s| *d >= s) && options.end.map_or(true, |e| *d <= e)
    };
    let test_indices: Vec<usize> = (0..dates.len()).filter(|&i| in_window(&dates[i])).collect();
    if test_indices.is_empty() {
        return Err(ForecastError::EmptyBacktest(format!(
            "no `{}` observations between {} and {}",
            series.column(),
            fmt_bound(options.start),
            fmt_bound(options.end)
        )));
    }

    let mut points = Vec::with_capacity(test_indices.len());
    let mut skipped = 0usize;
    for i in test_indices {
        if i < options.min_history {
            skipped += 1;
            continue;
        }
        let row = synthesize_row(&schema, &values[..i], dates[i], &options.holidays);
        let raw = model.predict(&row)?;
        let actual = values[i];
        let ratio = actual / raw;
        if !raw.is_finite() || raw.abs() < f64::EPSILON || !ratio.is_finite() {
            skipped += 1;
            continue;
        }
        points.push(BacktestPoint {
            date: dates[i],
            actual,
            raw,
            ratio,
        });
    }

    debug!(
        column = series.column(),
        points = points.len(),
        skipped = skipped,
        "one-step backtest"
    );

    if points.is_empty() {
        return Err(ForecastError::EmptyBacktest(format!(
            "no valid `{}` backtest pairs ({} skipped, min_history {})",
            series.column(),
            skipped,
            options.min_history
        )));
    }
    Ok(points)
}

fn fmt_bound(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "*".to_string())
}

/// Error of one candidate transform over the backtest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub policy: TransformPolicy,
    pub mae: f64,
    /// Fraction, 0.05 = 5%
    pub mape: f64,
    pub rmse: f64,
}

/// Ranked candidate transforms for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    candidates: Vec<CandidateScore>,
    median_ratio: f64,
    points: Vec<BacktestPoint>,
}

impl CalibrationReport {
    /// Candidates, lowest MAPE first.
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    /// The lowest-MAPE candidate.
    pub fn best(&self) -> &CandidateScore {
        // evaluate_candidates always scores the full candidate set
        &self.candidates[0]
    }

    /// Median of `actual / raw`, or 1.0 when that is unusable.
    pub fn median_ratio(&self) -> f64 {
        self.median_ratio
    }

    pub fn points(&self) -> &[BacktestPoint] {
        &self.points
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }
}

/// The candidate transforms for a given median ratio.
pub fn candidate_policies(median_ratio: f64) -> [TransformPolicy; 6] {
    let p = |mode, scale| TransformPolicy { mode, scale };
    [
        p(TransformMode::Identity, 1.0),
        p(TransformMode::LogInverse, 1.0),
        p(TransformMode::IdentityScaled, FIXED_SCALE),
        p(TransformMode::IdentityScaled, median_ratio),
        p(TransformMode::LogInverseScaled, FIXED_SCALE),
        p(TransformMode::LogInverseScaled, median_ratio),
    ]
}

/// Score every candidate transform against backtest pairs.
///
/// Candidates are ordered by ascending MAPE; ties keep candidate order.
pub fn evaluate_candidates(points: Vec<BacktestPoint>) -> Result<CalibrationReport> {
    if points.is_empty() {
        return Err(ForecastError::EmptyBacktest(
            "no backtest pairs to score".to_string(),
        ));
    }

    let ratios: Vec<f64> = points.iter().map(|p| p.ratio).collect();
    let median_ratio = metrics::median(&ratios)
        .ok()
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(1.0);

    let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
    let mut candidates = candidate_policies(median_ratio)
        .into_iter()
        .map(|policy| -> Result<CandidateScore> {
            let pred: Vec<f64> = points.iter().map(|p| policy.apply(p.raw)).collect();
            Ok(CandidateScore {
                policy,
                mae: metrics::mae(&actual, &pred)?,
                mape: metrics::mape(&actual, &pred)?,
                rmse: metrics::rmse(&actual, &pred)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    candidates.sort_by(|a, b| a.mape.total_cmp(&b.mape));

    Ok(CalibrationReport {
        candidates,
        median_ratio,
        points,
    })
}

/// Backtest and rank the candidate transforms in one call.
pub fn calibrate(
    series: &DailySeries,
    model: &dyn RevenueModel,
    options: &BacktestOptions,
) -> Result<CalibrationReport> {
    let points = backtest_one_step(series, model, options)?;
    let report = evaluate_candidates(points)?;
    let best = report.best();
    info!(
        column = series.column(),
        points = report.n_points(),
        median_ratio = report.median_ratio(),
        best = %best.policy,
        mape = best.mape,
        "calibration complete"
    );
    Ok(report)
}
