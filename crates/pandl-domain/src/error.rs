use thiserror::Error;

/// Rejections raised while parsing or constructing domain values.
///
/// These are produced before any store access and are never coerced into a
/// default value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid fiscal year `{0}`, expected YYYY-YY")]
    InvalidFiscalYear(String),
    #[error("invalid month key `{0}`, expected YYYY-MM")]
    InvalidMonthKey(String),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("day of week {0} outside 0-6")]
    DayOfWeekOutOfRange(i64),
    #[error("day of month {0} outside 1-31")]
    DayOfMonthOutOfRange(i64),
    #[error("yearly date `{0}` does not match MM-DD")]
    InvalidYearlyDate(String),
    #[error("unrecognized frequency `{0}`")]
    UnknownFrequency(String),
    #[error("{frequency} cost `{service}` is missing its schedule field")]
    MissingScheduleField { service: String, frequency: String },
    #[error("cost `{0}` is cancelled but has no cancellation date")]
    MissingCancellationDate(String),
    #[error("month {month} is not part of fiscal year {year}")]
    MonthOutsideFiscalYear { month: String, year: String },
    #[error("unrecognized wage month `{0}`")]
    InvalidWageMonth(String),
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: String },
}
