//! Per-day feature rows built against the schema a model declares.
//!
//! A model publishes an ordered list of feature names. [`FeatureSchema`]
//! classifies each name once per run; [`synthesize_row`] then fills one
//! value per name for every forecast step.

use crate::calendar::{self, CalendarFeatures, Season};
use crate::error::{ForecastError, Result};
use crate::holiday::HolidayCalendar;
use chrono::NaiveDate;
use statrs::statistics::Statistics;
use std::sync::Arc;

/// How one expected feature name is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Weekday,
    Month,
    Year,
    IsWeekend,
    Season(Season),
    IsHolidayWindow,
    /// Value `k` steps back from the most recent history point.
    Lag(usize),
    /// Mean of the last `w` history points.
    RollMean(usize),
    /// Not derivable here; always zero.
    Passthrough,
}

impl FeatureKind {
    /// Classify a feature name.
    pub fn classify(name: &str) -> Self {
        match name {
            calendar::WEEKDAY => return FeatureKind::Weekday,
            calendar::MONTH => return FeatureKind::Month,
            calendar::YEAR => return FeatureKind::Year,
            calendar::IS_WEEKEND => return FeatureKind::IsWeekend,
            calendar::IS_HOLIDAY_WINDOW => return FeatureKind::IsHolidayWindow,
            _ => {}
        }
        if let Some(season) = Season::from_column(name) {
            return FeatureKind::Season(season);
        }
        if let Some(k) = parse_window(name, "lag_") {
            return FeatureKind::Lag(k);
        }
        if let Some(w) = parse_window(name, "roll_mean_") {
            return FeatureKind::RollMean(w);
        }
        FeatureKind::Passthrough
    }

    fn needs_calendar(&self) -> bool {
        !matches!(
            self,
            FeatureKind::Lag(_) | FeatureKind::RollMean(_) | FeatureKind::Passthrough
        )
    }
}

fn parse_window(name: &str, prefix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?
        .parse::<usize>()
        .ok()
        .filter(|&n| n >= 1)
}

/// The ordered feature names a model expects, classified once.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
    kinds: Vec<FeatureKind>,
}

impl FeatureSchema {
    /// Resolve a model's declared feature names.
    ///
    /// # Errors
    /// [`ForecastError::ModelSchema`] if the model declares no names.
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(ForecastError::ModelSchema(
                "model declares no expected feature names".to_string(),
            ));
        }
        let names: Arc<[String]> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let kinds = names.iter().map(|n| FeatureKind::classify(n)).collect();
        Ok(Self { names, kinds })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn kinds(&self) -> &[FeatureKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names that are always zero-filled because nothing here derives them.
    pub fn passthrough_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.kinds)
            .filter(|(_, k)| **k == FeatureKind::Passthrough)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Largest lag or rolling window referenced by the schema.
    pub fn max_lookback(&self) -> usize {
        self.kinds
            .iter()
            .map(|k| match k {
                FeatureKind::Lag(n) | FeatureKind::RollMean(n) => *n,
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

/// One feature row, aligned with the schema it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a row from caller-supplied values, aligned to `schema`.
    ///
    /// Names the schema expects but `lookup` does not know are zero.
    pub fn aligned<F>(schema: &FeatureSchema, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<f64>,
    {
        let values = schema
            .names
            .iter()
            .map(|n| lookup(n).unwrap_or(0.0))
            .collect();
        Self {
            names: Arc::clone(&schema.names),
            values,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values in schema order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.values.iter().copied())
    }
}

/// Build the feature row for `date` from the current history.
///
/// `history` is ascending, most recent value last. Calendar features come
/// from `date` alone. A lag longer than the history falls back to the
/// earliest value; an empty history yields zero for every lag and mean.
pub fn synthesize_row(
    schema: &FeatureSchema,
    history: &[f64],
    date: NaiveDate,
    holidays: &HolidayCalendar,
) -> FeatureVector {
    let cal = schema
        .kinds
        .iter()
        .any(FeatureKind::needs_calendar)
        .then(|| CalendarFeatures::for_date(date, holidays));

    let values = schema
        .kinds
        .iter()
        .map(|kind| match (kind, cal.as_ref()) {
            (FeatureKind::Lag(k), _) => lag(history, *k),
            (FeatureKind::RollMean(w), _) => rolling_mean(history, *w),
            (FeatureKind::Passthrough, _) => 0.0,
            (kind, Some(c)) => calendar_value(kind, c),
            (_, None) => 0.0,
        })
        .collect();

    FeatureVector {
        names: Arc::clone(&schema.names),
        values,
    }
}

fn calendar_value(kind: &FeatureKind, c: &CalendarFeatures) -> f64 {
    match kind {
        FeatureKind::Weekday => f64::from(c.weekday),
        FeatureKind::Month => f64::from(c.month),
        FeatureKind::Year => f64::from(c.year),
        FeatureKind::IsWeekend => f64::from(u8::from(c.is_weekend)),
        FeatureKind::Season(s) => f64::from(c.season_flag(*s)),
        FeatureKind::IsHolidayWindow => f64::from(u8::from(c.is_holiday_window)),
        _ => 0.0,
    }
}

fn lag(history: &[f64], k: usize) -> f64 {
    match history.len() {
        0 => 0.0,
        n if n >= k => history[n - k],
        _ => history[0],
    }
}

fn rolling_mean(history: &[f64], w: usize) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let start = history.len().saturating_sub(w);
    history[start..].iter().mean()
}
