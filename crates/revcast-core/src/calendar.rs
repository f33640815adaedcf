//! Calendar feature derivation and table normalization.
//!
//! Every calendar value is a function of the date alone, so the normalizer
//! recomputes them instead of trusting columns already present in the input.
//! This keeps weekday/month/year consistent with the date and makes
//! [`normalize_calendar`] idempotent.

use crate::error::{ForecastError, Result};
use crate::holiday::HolidayCalendar;
use crate::table::{date_series, series_dates, DailyTable};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name of the date column every input table must carry.
pub const DATE_COLUMN: &str = "date";
pub const WEEKDAY: &str = "weekday";
pub const MONTH: &str = "month";
pub const YEAR: &str = "year";
pub const IS_WEEKEND: &str = "is_weekend";
pub const IS_HOLIDAY_WINDOW: &str = "is_holiday_window";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Meteorological season of a month (northern hemisphere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    /// Season for a month number (1-12).
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Name of the one-hot column for this season.
    pub fn column(&self) -> &'static str {
        match self {
            Season::Spring => "season_spring",
            Season::Summer => "season_summer",
            Season::Autumn => "season_autumn",
            Season::Winter => "season_winter",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Season::ALL.into_iter().find(|s| s.column() == name)
    }
}

/// Calendar features of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarFeatures {
    /// Day of week, Monday = 0
    pub weekday: u32,
    pub month: u32,
    pub year: i32,
    pub is_weekend: bool,
    pub season: Season,
    pub is_holiday_window: bool,
}

impl CalendarFeatures {
    pub fn for_date(date: NaiveDate, holidays: &HolidayCalendar) -> Self {
        let weekday = date.weekday().num_days_from_monday();
        Self {
            weekday,
            month: date.month(),
            year: date.year(),
            is_weekend: weekday >= 5,
            season: Season::from_month(date.month()),
            is_holiday_window: holidays.contains(date),
        }
    }

    /// One-hot flag for a given season.
    pub fn season_flag(&self, season: Season) -> u8 {
        u8::from(self.season == season)
    }
}

/// Parse a date cell, accepting plain dates and ISO date-times.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

/// Add or correct the canonical calendar columns of a date-keyed table.
///
/// Rows whose date cannot be parsed are dropped and the result is sorted
/// ascending by date (stable for equal dates). The date column comes back as
/// a polars `Date`; weekday, month, year, is_weekend and the four season
/// flags are `Int64` columns, and an existing `is_holiday_window` column is
/// coerced to 0/1 integers.
///
/// # Errors
/// [`ForecastError::Schema`] if the table has no `date` column or the column
/// is neither text, integer `YYYYMMDD` nor a temporal type.
pub fn normalize_calendar(table: &DailyTable) -> Result<DailyTable> {
    let raw_dates = table.column(DATE_COLUMN).ok_or_else(|| {
        ForecastError::Schema(format!(
            "missing `{}` column (available: {})",
            DATE_COLUMN,
            table.column_names().join(", ")
        ))
    })?;
    let parsed = parse_date_column(raw_dates)?;

    let mut df = table.frame().clone();
    df.with_column(date_series(DATE_COLUMN, &parsed)?)?;
    let valid = df.column(DATE_COLUMN)?.is_not_null();
    let df = df
        .filter(&valid)?
        .sort([DATE_COLUMN], false, true)?;

    let dropped = table.n_rows() - df.height();
    if dropped > 0 {
        warn!(dropped = dropped, "dropped rows with unparseable dates");
    }

    let dates: Vec<NaiveDate> = series_dates(df.column(DATE_COLUMN)?)?
        .into_iter()
        .flatten()
        .collect();
    let features: Vec<CalendarFeatures> = dates
        .iter()
        .map(|d| CalendarFeatures::for_date(*d, &HolidayCalendar::empty()))
        .collect();
    let int_column = |name: &str, f: &dyn Fn(&CalendarFeatures) -> i64| -> Series {
        Series::new(name, features.iter().map(f).collect::<Vec<i64>>())
    };

    let mut out = DailyTable::from_frame(df);
    out.set_column(int_column(WEEKDAY, &|c| i64::from(c.weekday)))?;
    out.set_column(int_column(MONTH, &|c| i64::from(c.month)))?;
    out.set_column(int_column(YEAR, &|c| i64::from(c.year)))?;
    out.set_column(int_column(IS_WEEKEND, &|c| i64::from(c.is_weekend)))?;
    for season in Season::ALL {
        out.set_column(int_column(season.column(), &|c| i64::from(c.season_flag(season))))?;
    }

    if let Some(existing) = out.column(IS_HOLIDAY_WINDOW) {
        let coerced = coerce_flag(existing)?;
        out.set_column(coerced)?;
    }

    Ok(out)
}

/// Parse the raw date column cell by cell; unparseable cells become null.
fn parse_date_column(raw: &Series) -> Result<Vec<Option<NaiveDate>>> {
    match raw.dtype() {
        DataType::Utf8 => Ok(raw.utf8()?.into_iter().map(|c| c.and_then(parse_date)).collect()),
        DataType::Date | DataType::Datetime(_, _) => series_dates(&raw.cast(&DataType::Date)?),
        dtype if dtype.is_integer() => {
            let text = raw.cast(&DataType::Utf8)?;
            let cells = text.utf8()?;
            Ok(cells.into_iter().map(|c| c.and_then(parse_date)).collect())
        }
        other => Err(ForecastError::Schema(format!(
            "`{}` column has type {}, expected text or date",
            DATE_COLUMN, other
        ))),
    }
}

/// Coerce an arbitrary column to a 0/1 integer flag; unparseable cells -> 0.
fn coerce_flag(column: &Series) -> Result<Series> {
    let numeric = column.cast(&DataType::Float64)?;
    let flags: Vec<i64> = numeric
        .f64()?
        .into_iter()
        .map(|v| i64::from(v.unwrap_or(0.0) != 0.0))
        .collect();
    Ok(Series::new(column.name(), flags))
}
