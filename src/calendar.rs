use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc, Weekday};

use crate::error::FilterError;

/// Whole days elapsed from `from` to `to`, truncated toward zero.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_days()
}

/// The office week runs Sunday to Thursday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat)
}

/// Inclusive count of working days between two dates, skipping weekends and holidays.
pub fn working_days(start: NaiveDate, end: NaiveDate, holidays: &[NaiveDate]) -> u32 {
    if start > end {
        return 0;
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !is_weekend(*day) && !holidays.contains(day))
        .count() as u32
}

/// A calendar month such as `2026-10`, used to scope rows by creation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    start: NaiveDate,
    end: NaiveDate,
}

impl Month {
    /// Half-open UTC range `[first day, first day of next month)`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start.and_time(NaiveTime::MIN).and_utc(),
            self.end.and_time(NaiveTime::MIN).and_utc(),
        )
    }
}

impl FromStr for Month {
    type Err = FilterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || FilterError::InvalidMonth(value.to_string());
        let trimmed = value.trim();
        if trimmed.len() != 7 {
            return Err(invalid());
        }
        let start = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
            .map_err(|_| invalid())?;
        let end = start.checked_add_months(Months::new(1)).ok_or_else(invalid)?;
        Ok(Month { start, end })
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%Y-%m"))
    }
}
