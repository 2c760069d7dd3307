//! Immutable civil dates and the three retention granularities.
//!
//! Index names carry their date as an integer suffix (`20240108`, `202401`,
//! `2024`). [`CivilDate`] does the calendar arithmetic and renders those
//! suffixes; [`Granularity`] selects the unit for both.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Local, Months, NaiveDate};

use crate::error::KeeperError;

/// Unit in which retention windows and index suffixes are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Daily,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
            Granularity::Yearly => "YEARLY",
        }
    }

    /// Date pattern of the suffix, as written in policy filters.
    pub fn date_pattern(&self) -> &'static str {
        match self {
            Granularity::Daily => "YYYYMMDD",
            Granularity::Monthly => "YYYYMM",
            Granularity::Yearly => "YYYY",
        }
    }

    /// Number of digits in a rendered suffix.
    pub fn suffix_digits(&self) -> usize {
        self.date_pattern().len()
    }

    /// Granularity implied by a suffix date pattern.
    pub fn from_date_pattern(pattern: &str) -> Result<Self, KeeperError> {
        match pattern.trim().to_ascii_uppercase().as_str() {
            "YYYYMMDD" => Ok(Granularity::Daily),
            "YYYYMM" => Ok(Granularity::Monthly),
            "YYYY" => Ok(Granularity::Yearly),
            other => Err(KeeperError::Config(format!(
                "unsupported date pattern: {other} (expected YYYYMMDD, YYYYMM or YYYY)"
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Granularity::Daily),
            "MONTHLY" => Ok(Granularity::Monthly),
            "YEARLY" => Ok(Granularity::Yearly),
            other => Err(KeeperError::Config(format!(
                "unsupported retention type: {other} (expected DAILY, MONTHLY or YEARLY)"
            ))),
        }
    }
}

/// A calendar date on the process-local clock.
///
/// Values are immutable; arithmetic returns a new date. Month and year steps
/// clamp to the last day of the target month (Jan 31 + 1 month = Feb 28/29).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CivilDate(NaiveDate);

impl CivilDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(CivilDate)
    }

    /// Today's date on the local clock.
    pub fn today() -> Self {
        CivilDate(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn add_days(self, days: i64) -> Result<Self, KeeperError> {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        shifted
            .map(CivilDate)
            .ok_or_else(|| self.out_of_range(days, "days"))
    }

    pub fn add_months(self, months: i64) -> Result<Self, KeeperError> {
        let magnitude =
            u32::try_from(months.unsigned_abs()).map_err(|_| self.out_of_range(months, "months"))?;
        let shifted = if months >= 0 {
            self.0.checked_add_months(Months::new(magnitude))
        } else {
            self.0.checked_sub_months(Months::new(magnitude))
        };
        shifted
            .map(CivilDate)
            .ok_or_else(|| self.out_of_range(months, "months"))
    }

    pub fn add_years(self, years: i64) -> Result<Self, KeeperError> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| self.out_of_range(years, "years"))?;
        self.add_months(months)
    }

    /// Move `units` steps of `granularity` (negative goes back in time).
    pub fn shift(self, granularity: Granularity, units: i64) -> Result<Self, KeeperError> {
        match granularity {
            Granularity::Daily => self.add_days(units),
            Granularity::Monthly => self.add_months(units),
            Granularity::Yearly => self.add_years(units),
        }
    }

    /// Integer suffix form: `YYYYMMDD`, `YYYYMM` or `YYYY`.
    pub fn suffix(&self, granularity: Granularity) -> u32 {
        let year = u32::try_from(self.year()).unwrap_or(0);
        match granularity {
            Granularity::Daily => year * 10_000 + self.month() * 100 + self.day(),
            Granularity::Monthly => year * 100 + self.month(),
            Granularity::Yearly => year,
        }
    }

    /// Inverse of [`suffix`](Self::suffix); missing parts default to the first
    /// of the month / year. Returns `None` for impossible dates.
    pub fn from_suffix(value: u32, granularity: Granularity) -> Option<Self> {
        let (year, month, day) = match granularity {
            Granularity::Daily => (value / 10_000, (value / 100) % 100, value % 100),
            Granularity::Monthly => (value / 100, value % 100, 1),
            Granularity::Yearly => (value, 1, 1),
        };
        Self::from_ymd(i32::try_from(year).ok()?, month, day)
    }

    fn out_of_range(&self, amount: i64, unit: &str) -> KeeperError {
        KeeperError::DateOutOfRange(format!("{} {:+} {}", self, amount, unit))
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for CivilDate {
    fn from(date: NaiveDate) -> Self {
        CivilDate(date)
    }
}
