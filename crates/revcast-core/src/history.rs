//! The mutable history a single forecast run steps over.

use crate::table::DailySeries;
use chrono::NaiveDate;

/// Ordered (date, value) history owned by one forecast run.
///
/// Starts as a bounded suffix of the observations strictly before the
/// forecast start and grows by one point per step.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl HistoryWindow {
    /// Last `max_len` observations of `series` strictly before `start`.
    pub fn from_series_before(series: &DailySeries, start: NaiveDate, max_len: usize) -> Self {
        let end = series.count_before(start);
        let begin = end.saturating_sub(max_len);
        Self {
            dates: series.dates()[begin..end].to_vec(),
            values: series.values()[begin..end].to_vec(),
        }
    }

    pub fn push(&mut self, date: NaiveDate, value: f64) {
        self.dates.push(date);
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}
