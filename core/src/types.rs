//! Shared primitive types used across the engine.

use crate::error::{SnapshotError, SnapshotResult};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable identifier for a control entry or one of its referenced records.
pub type EntityId = String;

/// A persisted snapshot identifier. Regenerating a month always mints a new one.
pub type SnapshotId = String;

/// The "YYYY-MM" partition key of a monthly snapshot.
///
/// Field order matters: the derived `Ord` compares year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> SnapshotResult<Self> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(SnapshotError::InvalidArgument(format!(
                "year-month out of range: {year}-{month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Parse a strict "YYYY-MM" string.
    pub fn parse(s: &str) -> SnapshotResult<Self> {
        let invalid =
            || SnapshotError::InvalidArgument(format!("expected YYYY-MM, got {s:?}"));

        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let (year_part, month_part) = (&s[..4], &s[5..]);
        if !year_part.bytes().chain(month_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// The month that contains `instant` when read on a wall clock at `offset`.
    pub fn containing(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::from_date(instant.with_timezone(&offset).date_naive())
    }

    pub fn first_day(&self) -> NaiveDate {
        // year/month are validated on construction, so day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Every month from `self` through `last`, both inclusive.
    /// Empty when `last` precedes `self`.
    pub fn through(self, last: YearMonth) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut cursor = self;
        while cursor <= last {
            months.push(cursor);
            cursor = cursor.next();
        }
        months
    }

    /// First and last instants of this calendar month at `offset`.
    pub fn window(&self, offset: FixedOffset) -> MonthWindow {
        let start = month_start_utc(self.first_day(), offset);
        let next_start = month_start_utc(self.next().first_day(), offset);
        MonthWindow {
            start,
            end: next_start - Duration::milliseconds(1),
        }
    }
}

fn month_start_utc(first_day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = first_day.and_time(chrono::NaiveTime::MIN);
    let utc_naive = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc_naive)
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = SnapshotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Inclusive `[start, end]` bounds of one calendar month, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let t = instant.timestamp_millis();
        t >= self.start.timestamp_millis() && t <= self.end.timestamp_millis()
    }

    /// Does the lifetime `[entered, deleted ?? +inf)` overlap this month?
    pub fn overlaps_lifetime(
        &self,
        entered: DateTime<Utc>,
        deleted: Option<DateTime<Utc>>,
    ) -> bool {
        let entered_ok = entered.timestamp_millis() <= self.end.timestamp_millis();
        let still_alive = deleted
            .map(|d| d.timestamp_millis() >= self.start.timestamp_millis())
            .unwrap_or(true);
        entered_ok && still_alive
    }
}
