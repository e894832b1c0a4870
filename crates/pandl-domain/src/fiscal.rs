//! Fiscal calendar arithmetic for the 1 October to 30 September trading year.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Calendar month in which every fiscal year starts.
pub const FISCAL_START_MONTH: u32 = 10;
/// Number of months in a fiscal year.
pub const MONTHS_PER_FISCAL_YEAR: usize = 12;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parses a `YYYY-MM-DD` date. Trailing time components (`T10:00:00Z`) are ignored.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = value.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    if date_part.len() != 10 {
        return Err(ValidationError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Returns the number of days in the given calendar month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Returns the English name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// Resolves a month name (`"October"`, `"oct"`) to its 1-based number.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lowered = name.trim().to_ascii_lowercase();
    if lowered.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|candidate| {
            let candidate = candidate.to_ascii_lowercase();
            candidate == lowered || (lowered.len() == 3 && candidate.starts_with(&lowered))
        })
        .map(|idx| idx as u32 + 1)
}

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

/// A calendar month identified as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(ValidationError::InvalidMonthKey(format!(
                "{year:04}-{month:02}"
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day() + Duration::days(i64::from(self.days_in_month()) - 1)
    }

    /// Iterates every date of the month in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let first = self.first_day();
        (0..i64::from(self.days_in_month())).map(move |offset| first + Duration::days(offset))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The fiscal year this month belongs to.
    pub fn fiscal_year(&self) -> FiscalYear {
        if self.month >= FISCAL_START_MONTH {
            FiscalYear {
                start_year: self.year,
            }
        } else {
            FiscalYear {
                start_year: self.year - 1,
            }
        }
    }

    /// 1-based ordinal of this month inside its fiscal year (October is 1).
    pub fn fiscal_position(&self) -> usize {
        ((self.month + 12 - FISCAL_START_MONTH) % 12) as usize + 1
    }

    pub fn name(&self) -> &'static str {
        month_name(self.month).unwrap_or("")
    }

    /// Three-letter label, e.g. `Oct`.
    pub fn short_label(&self) -> &'static str {
        self.name().get(..3).unwrap_or("")
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidMonthKey(value.to_string());
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        if !all_digits(year, 4) || !all_digits(month, 2) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MonthKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

/// Inclusive start and end dates of a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearDates {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FiscalYearDates {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A fiscal year labelled `YYYY-YY`, spanning October of the first year to
/// September of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalYear {
    start_year: i32,
}

impl FiscalYear {
    pub fn new(start_year: i32) -> Result<Self, ValidationError> {
        if !(1..=9998).contains(&start_year) {
            return Err(ValidationError::InvalidFiscalYear(start_year.to_string()));
        }
        Ok(Self { start_year })
    }

    /// The fiscal year that contains `date`.
    pub fn containing(date: NaiveDate) -> Self {
        MonthKey::of(date).fiscal_year()
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    pub fn dates(&self) -> FiscalYearDates {
        FiscalYearDates {
            start: NaiveDate::from_ymd_opt(self.start_year, FISCAL_START_MONTH, 1)
                .unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(self.end_year(), 9, 30).unwrap_or(NaiveDate::MAX),
        }
    }

    /// The twelve month keys of the year, October first.
    pub fn months(&self) -> [MonthKey; MONTHS_PER_FISCAL_YEAR] {
        let mut current = MonthKey {
            year: self.start_year,
            month: FISCAL_START_MONTH,
        };
        let mut months = [current; MONTHS_PER_FISCAL_YEAR];
        for slot in months.iter_mut().skip(1) {
            current = current.next();
            *slot = current;
        }
        months
    }

    /// Month key at a 1-based fiscal position.
    pub fn month_at(&self, position: usize) -> Option<MonthKey> {
        position
            .checked_sub(1)
            .and_then(|idx| self.months().get(idx).copied())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates().contains(date)
    }

    pub fn contains_month(&self, month: MonthKey) -> bool {
        month.fiscal_year() == *self
    }

    /// Ensures `month` belongs to this year.
    pub fn require_month(&self, month: MonthKey) -> Result<(), ValidationError> {
        if self.contains_month(month) {
            Ok(())
        } else {
            Err(ValidationError::MonthOutsideFiscalYear {
                month: month.to_string(),
                year: self.to_string(),
            })
        }
    }

    /// True once `today` is strictly after 30 September of the closing year.
    pub fn is_past_end(&self, today: NaiveDate) -> bool {
        today > self.dates().end
    }

    pub fn next(&self) -> Self {
        Self {
            start_year: self.start_year + 1,
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            start_year: self.start_year - 1,
        }
    }

    /// Long display form, e.g. `2024-2025`.
    pub fn display_label(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year())
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}",
            self.start_year,
            self.end_year().rem_euclid(100)
        )
    }
}

impl FromStr for FiscalYear {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFiscalYear(value.to_string());
        let (first, second) = value.trim().split_once('-').ok_or_else(invalid)?;
        if !all_digits(first, 4) || !all_digits(second, 2) {
            return Err(invalid());
        }
        let start_year = first.parse::<i32>().map_err(|_| invalid())?;
        let suffix = second.parse::<i32>().map_err(|_| invalid())?;
        if (start_year + 1).rem_euclid(100) != suffix {
            return Err(invalid());
        }
        Self::new(start_year).map_err(|_| invalid())
    }
}

impl TryFrom<String> for FiscalYear {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FiscalYear> for String {
    fn from(value: FiscalYear) -> Self {
        value.to_string()
    }
}
