//! Recurring fixed-cost definitions and their schedules.

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::ValidationError,
    figures::{split_vat, STANDARD_VAT_RATE},
    fiscal::parse_date,
};

/// Discriminator stored in the `frequency` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        };
        f.write_str(label)
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(ValidationError::UnknownFrequency(value.to_string())),
        }
    }
}

/// Month and day of a yearly charge, written `MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearlyDate {
    month: u32,
    day: u32,
}

impl YearlyDate {
    pub fn new(month: u32, day: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(ValidationError::InvalidYearlyDate(format!(
                "{month:02}-{day:02}"
            )));
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl fmt::Display for YearlyDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for YearlyDate {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidYearlyDate(value.to_string());
        let (month, day) = value.trim().split_once('-').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.chars().all(|c| c.is_ascii_digit());
        if !two_digits(month) || !two_digits(day) {
            return Err(invalid());
        }
        let month = month.parse().map_err(|_| invalid())?;
        let day = day.parse().map_err(|_| invalid())?;
        Self::new(month, day).map_err(|_| invalid())
    }
}

/// When a fixed cost falls due. Each variant carries only its own schedule field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    Weekly { day: Weekday },
    Monthly { day_of_month: u32 },
    Yearly { date: YearlyDate },
    /// Stored record written before frequencies existed. Charged every month.
    Legacy,
}

impl Schedule {
    /// `day_of_week` counts from Sunday = 0, as stored.
    pub fn weekly(day_of_week: i64) -> Result<Self, ValidationError> {
        let day = match day_of_week {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            6 => Weekday::Sat,
            other => return Err(ValidationError::DayOfWeekOutOfRange(other)),
        };
        Ok(Schedule::Weekly { day })
    }

    pub fn monthly(day_of_month: i64) -> Result<Self, ValidationError> {
        if !(1..=31).contains(&day_of_month) {
            return Err(ValidationError::DayOfMonthOutOfRange(day_of_month));
        }
        Ok(Schedule::Monthly {
            day_of_month: day_of_month as u32,
        })
    }

    pub fn yearly(month_day: &str) -> Result<Self, ValidationError> {
        Ok(Schedule::Yearly {
            date: month_day.parse()?,
        })
    }

    pub fn frequency(&self) -> Option<Frequency> {
        match self {
            Schedule::Weekly { .. } => Some(Frequency::Weekly),
            Schedule::Monthly { .. } => Some(Frequency::Monthly),
            Schedule::Yearly { .. } => Some(Frequency::Yearly),
            Schedule::Legacy => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Schedule::Weekly { day } => format!("Weekly ({day})"),
            Schedule::Monthly { day_of_month } => format!("Monthly (day {day_of_month})"),
            Schedule::Yearly { date } => format!("Yearly ({date})"),
            Schedule::Legacy => "Unspecified".into(),
        }
    }
}

/// Lifecycle of a definition. Cancelled costs are kept for historical accrual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostStatus {
    Active,
    Cancelled { date: NaiveDate },
}

/// Converts a service name into its document id, e.g. `Card Machine` -> `card-machine`.
pub fn service_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// A recurring cost such as rent, a subscription or a weekly wage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FixedCostDocument", into = "FixedCostDocument")]
pub struct FixedCost {
    pub service_id: String,
    pub service: String,
    pub cost: f64,
    pub net_cost: f64,
    pub vat: f64,
    pub includes_vat: bool,
    pub schedule: Schedule,
    pub status: CostStatus,
}

impl FixedCost {
    pub fn new(
        service: impl Into<String>,
        cost: f64,
        includes_vat: bool,
        schedule: Schedule,
    ) -> Result<Self, ValidationError> {
        if cost < 0.0 || cost.is_nan() {
            return Err(ValidationError::NegativeAmount {
                field: "cost",
                value: cost.to_string(),
            });
        }
        let service = service.into();
        let (net_cost, vat) = if includes_vat {
            split_vat(cost)
        } else {
            (cost, 0.0)
        };
        Ok(Self {
            service_id: service_slug(&service),
            service,
            cost,
            net_cost,
            vat,
            includes_vat,
            schedule,
            status: CostStatus::Active,
        })
    }

    /// Soft-deletes the cost; it still accrues up to and including `date`'s month.
    pub fn cancel(&mut self, date: NaiveDate) {
        self.status = CostStatus::Cancelled { date };
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, CostStatus::Cancelled { .. })
    }

    pub fn cancelled_date(&self) -> Option<NaiveDate> {
        match self.status {
            CostStatus::Active => None,
            CostStatus::Cancelled { date } => Some(date),
        }
    }

    pub fn vat_rate() -> f64 {
        STANDARD_VAT_RATE
    }
}

/// Flat persisted shape of a [`FixedCost`], field-for-field with stored documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedCostDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub net_cost: Option<f64>,
    #[serde(default)]
    pub vat: Option<f64>,
    #[serde(default)]
    pub includes_vat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub day_of_week: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub day_of_month: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_date: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntegerOrText {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Older form submissions stored schedule numbers as strings (`"5"`).
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IntegerOrText>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(IntegerOrText::Integer(value)) => Ok(Some(value)),
        Some(IntegerOrText::Float(value)) if value.fract() == 0.0 => Ok(Some(value as i64)),
        Some(IntegerOrText::Float(value)) => Err(serde::de::Error::custom(format!(
            "expected whole number, got {value}"
        ))),
        Some(IntegerOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(IntegerOrText::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected number, got `{text}`"))),
    }
}

impl TryFrom<FixedCostDocument> for FixedCost {
    type Error = ValidationError;

    fn try_from(doc: FixedCostDocument) -> Result<Self, Self::Error> {
        if doc.cost < 0.0 || doc.cost.is_nan() {
            return Err(ValidationError::NegativeAmount {
                field: "cost",
                value: doc.cost.to_string(),
            });
        }
        let missing = |frequency: Frequency| ValidationError::MissingScheduleField {
            service: doc.service.clone(),
            frequency: frequency.to_string(),
        };
        let schedule = match doc.frequency.as_deref().map(str::trim) {
            None | Some("") => Schedule::Legacy,
            Some(raw) => match raw.parse::<Frequency>()? {
                Frequency::Weekly => {
                    Schedule::weekly(doc.day_of_week.ok_or_else(|| missing(Frequency::Weekly))?)?
                }
                Frequency::Monthly => Schedule::monthly(
                    doc.day_of_month
                        .ok_or_else(|| missing(Frequency::Monthly))?,
                )?,
                Frequency::Yearly => Schedule::yearly(
                    doc.yearly_date
                        .as_deref()
                        .ok_or_else(|| missing(Frequency::Yearly))?,
                )?,
            },
        };
        let status = if doc.cancelled {
            let raw = doc
                .cancelled_date
                .as_deref()
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ValidationError::MissingCancellationDate(doc.service.clone()))?;
            CostStatus::Cancelled {
                date: parse_date(raw)?,
            }
        } else {
            CostStatus::Active
        };
        let (default_net, default_vat) = if doc.includes_vat {
            split_vat(doc.cost)
        } else {
            (doc.cost, 0.0)
        };
        Ok(FixedCost {
            service_id: doc
                .service_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| service_slug(&doc.service)),
            service: doc.service,
            cost: doc.cost,
            net_cost: doc.net_cost.unwrap_or(default_net),
            vat: doc.vat.unwrap_or(default_vat),
            includes_vat: doc.includes_vat,
            schedule,
            status,
        })
    }
}

impl From<FixedCost> for FixedCostDocument {
    fn from(cost: FixedCost) -> Self {
        let mut doc = FixedCostDocument {
            service_id: Some(cost.service_id),
            service: cost.service,
            cost: cost.cost,
            net_cost: Some(cost.net_cost),
            vat: Some(cost.vat),
            includes_vat: cost.includes_vat,
            frequency: cost.schedule.frequency().map(|f| f.to_string()),
            ..FixedCostDocument::default()
        };
        match cost.schedule {
            Schedule::Weekly { day } => {
                doc.day_of_week = Some(i64::from(day.num_days_from_sunday()))
            }
            Schedule::Monthly { day_of_month } => doc.day_of_month = Some(i64::from(day_of_month)),
            Schedule::Yearly { date } => doc.yearly_date = Some(date.to_string()),
            Schedule::Legacy => {}
        }
        if let CostStatus::Cancelled { date } = cost.status {
            doc.cancelled = true;
            doc.cancelled_date = Some(date.format("%Y-%m-%d").to_string());
        }
        doc
    }
}
