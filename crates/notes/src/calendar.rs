//! ISO-8601 week arithmetic.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};

/// An ISO-8601 week, identified internally by its Monday so that stepping
/// backwards crosses year boundaries correctly (week 1 of 2027 is preceded by
/// week 53 of 2026, not "week 0").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeek {
    monday: NaiveDate,
}

impl IsoWeek {
    pub fn of(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        Self {
            monday: date - Duration::days(offset),
        }
    }

    /// ISO week-numbering year, which differs from the calendar year for a
    /// few days around New Year.
    pub fn year(&self) -> i32 {
        self.monday.iso_week().year()
    }

    pub fn week(&self) -> u32 {
        self.monday.iso_week().week()
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn previous(&self) -> Self {
        self.weeks_back(1)
    }

    pub fn weeks_back(&self, weeks: u32) -> Self {
        Self {
            monday: self.monday - Duration::weeks(i64::from(weeks)),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year(), self.week())
    }
}
