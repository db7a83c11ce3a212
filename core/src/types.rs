//! Shared primitive types used across the entire pipeline.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A stable, unique identifier for a simulated customer.
pub type EntityId = String;

/// The canonical run identifier.
pub type RunId = String;

/// An ISO-8601 week: the key weekly activity is bucketed and ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl IsoWeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self { year: iso.year(), week: iso.week() }
    }

    /// Monday of this ISO week, or None for a week that does not exist.
    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }
}

/// Every Monday in `[start, end]`, both ends inclusive.
pub fn mondays_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let offset = (7 - start.weekday().num_days_from_monday()) % 7;
    let first = start + chrono::Duration::days(offset as i64);
    first
        .iter_weeks()
        .take_while(move |d| *d <= end)
}
