//! Holiday proximity flags for recurring "MM-DD" dates.

use chrono::{Datelike, NaiveDate};

/// A set of recurring holidays parsed once and queried per date.
///
/// Entries that do not parse as `MM-DD` never match and never raise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    raw: Vec<String>,
    days: Vec<(u32, u32)>,
    window_days: u32,
}

impl HolidayCalendar {
    /// Build a calendar from "MM-DD" strings and a window in days.
    pub fn new<S: AsRef<str>>(holidays: &[S], window_days: u32) -> Self {
        let raw: Vec<String> = holidays.iter().map(|h| h.as_ref().to_string()).collect();
        let days = raw.iter().filter_map(|h| parse_month_day(h)).collect();
        Self {
            raw,
            days,
            window_days,
        }
    }

    /// Calendar that never flags anything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn holidays(&self) -> &[String] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Whether `date` lies within the window of a holiday in the same year.
    pub fn contains(&self, date: NaiveDate) -> bool {
        if self.window_days == 0 {
            let today = (date.month(), date.day());
            return self.days.iter().any(|&md| md == today);
        }

        let window = i64::from(self.window_days);
        self.days.iter().any(|&(month, day)| {
            NaiveDate::from_ymd_opt(date.year(), month, day)
                .map(|holiday| (date - holiday).num_days().abs() <= window)
                .unwrap_or(false)
        })
    }

    /// The holiday flag as an integer feature value.
    pub fn flag(&self, date: NaiveDate) -> u8 {
        u8::from(self.contains(date))
    }
}

/// Compute the near-holiday flag for a single date.
///
/// Returns 1 when `date` is within `window_days` of any holiday in its own
/// year, 0 otherwise. A window of 0 requires the same month and day.
pub fn holiday_flag<S: AsRef<str>>(date: NaiveDate, holidays: &[S], window_days: u32) -> u8 {
    HolidayCalendar::new(holidays, window_days).flag(date)
}

fn parse_month_day(s: &str) -> Option<(u32, u32)> {
    let (month, day) = s.trim().split_once('-')?;
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((month, day))
}
