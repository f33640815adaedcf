//! Date-keyed tables and the cleaned daily target series extracted from them.

use crate::calendar::{normalize_calendar, DATE_COLUMN};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::warn;

/// Days since 1970-01-01, the physical value of a polars `Date`.
pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

pub(crate) fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(Duration::days(i64::from(days)))
}

/// Build a polars `Date` series from optional dates.
pub(crate) fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> Result<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(epoch_days)).collect();
    Ok(Series::new(name, days).cast(&DataType::Date)?)
}

/// Read a `Date` series back as chrono dates.
pub(crate) fn series_dates(series: &Series) -> Result<Vec<Option<NaiveDate>>> {
    let days = series.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(from_epoch_days))
        .collect())
}

/// A date-keyed table backed by a polars [`DataFrame`].
#[derive(Debug, Clone, Default)]
pub struct DailyTable {
    df: DataFrame,
}

impl DailyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frame(df: DataFrame) -> Self {
        Self { df }
    }

    /// Build a table from daily dates and numeric columns.
    pub fn from_series(dates: &[NaiveDate], columns: &[(&str, &[f64])]) -> Result<Self> {
        let dates: Vec<Option<NaiveDate>> = dates.iter().copied().map(Some).collect();
        let mut series = vec![date_series(DATE_COLUMN, &dates)?];
        series.extend(columns.iter().map(|(name, values)| Series::new(name, *values)));
        Ok(Self {
            df: DataFrame::new(series)?,
        })
    }

    /// Add a column, replacing any column with the same name in place.
    pub fn set_column(&mut self, column: Series) -> Result<()> {
        let height = self.df.height();
        let replaces_only_column = self.df.width() == 1
            && self.df.get_column_names().first() == Some(&column.name());
        if self.df.width() > 0 && column.len() != height && !replaces_only_column {
            return Err(ForecastError::InvalidInput(format!(
                "Column `{}` has {} rows but the table has {}",
                column.name(),
                column.len(),
                height
            )));
        }
        if replaces_only_column {
            self.df = DataFrame::new(vec![column])?;
        } else {
            self.df.with_column(column)?;
        }
        Ok(())
    }

    /// Builder-style variant of [`DailyTable::set_column`].
    pub fn with_column(mut self, column: Series) -> Result<Self> {
        self.set_column(column)?;
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.df.column(name).ok()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.df.get_column_names()
    }

    pub fn n_rows(&self) -> usize {
        self.df.height()
    }

    pub fn n_columns(&self) -> usize {
        self.df.width()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    /// Read a table from CSV with a header row.
    ///
    /// Column types come from polars' schema inference; empty cells are
    /// null. Dates stay text (or integers for `YYYYMMDD`) until the calendar
    /// normalizer parses them.
    pub fn from_csv_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let df = CsvReader::new(Cursor::new(buf))
            .infer_schema(None)
            .has_header(true)
            .finish()?;
        Ok(Self { df })
    }

    /// Read a table from a CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }
}

/// A cleaned daily target series: ascending, unique dates, finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    column: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DailySeries {
    /// Build a series from parallel date and value slices.
    ///
    /// Missing and non-finite values are dropped, the rest sorted by date.
    /// When a date occurs more than once the last occurrence wins.
    pub fn from_observations(
        column: &str,
        dates: &[NaiveDate],
        values: &[Option<f64>],
    ) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidInput(
                "Dates and values must have the same length".to_string(),
            ));
        }

        let mut pairs: Vec<(NaiveDate, f64)> = dates
            .iter()
            .zip(values.iter())
            .filter_map(|(d, v)| v.filter(|x| x.is_finite()).map(|x| (*d, x)))
            .collect();
        pairs.sort_by_key(|(d, _)| *d);

        if pairs.is_empty() {
            return Err(ForecastError::EmptyHistory(format!(
                "column `{}` has no usable values after cleaning",
                column
            )));
        }

        let mut out_dates: Vec<NaiveDate> = Vec::with_capacity(pairs.len());
        let mut out_values: Vec<f64> = Vec::with_capacity(pairs.len());
        let mut duplicates = 0usize;
        for (d, v) in pairs {
            if out_dates.last() == Some(&d) {
                if let Some(last) = out_values.last_mut() {
                    *last = v;
                }
                duplicates += 1;
            } else {
                out_dates.push(d);
                out_values.push(v);
            }
        }

        if duplicates > 0 {
            warn!(
                column = column,
                duplicates = duplicates,
                "duplicate dates in history, keeping the last value per date"
            );
        }

        Ok(Self {
            column: column.to_string(),
            dates: out_dates,
            values: out_values,
        })
    }

    /// Normalize the table's calendar and extract one target column.
    ///
    /// # Errors
    /// [`ForecastError::Schema`] if the target is missing or holds dates, if
    /// no date in a non-empty table parses, or if the target has no numeric
    /// cell left.
    pub fn from_table(table: &DailyTable, column: &str) -> Result<Self> {
        let normalized = normalize_calendar(table)?;

        let target = normalized.column(column).ok_or_else(|| {
            ForecastError::Schema(format!(
                "missing target column `{}` (available: {})",
                column,
                normalized.column_names().join(", ")
            ))
        })?;
        if matches!(target.dtype(), DataType::Date | DataType::Datetime(_, _)) {
            return Err(ForecastError::Schema(format!(
                "target column `{}` holds dates, not numbers",
                column
            )));
        }
        if table.n_rows() > 0 && normalized.n_rows() == 0 {
            return Err(ForecastError::Schema(format!(
                "`{}` column has no parseable dates in {} rows",
                DATE_COLUMN,
                table.n_rows()
            )));
        }

        let date_column = normalized.column(DATE_COLUMN).ok_or_else(|| {
            ForecastError::InternalError("normalized table has no date column".to_string())
        })?;
        let dates: Vec<NaiveDate> = series_dates(date_column)?.into_iter().flatten().collect();

        let numeric = target.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = numeric.f64()?.into_iter().collect();
        if !values.is_empty() && values.iter().all(Option::is_none) {
            return Err(ForecastError::Schema(format!(
                "target column `{}` ({}) has no numeric values",
                column,
                target.dtype()
            )));
        }

        Self::from_observations(column, &dates, &values)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Number of observations strictly before `date`.
    pub fn count_before(&self, date: NaiveDate) -> usize {
        self.dates.partition_point(|d| *d < date)
    }

    /// Value observed on `date`, if any.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }
}
