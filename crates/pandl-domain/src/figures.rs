//! Source records entered by hand: daily takings, wage runs and sundry expenses.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ValidationError,
    fiscal::{month_from_name, month_name, FiscalYear, MonthKey},
};

/// UK standard VAT rate applied to takings and VAT-inclusive costs.
pub const STANDARD_VAT_RATE: f64 = 0.20;
/// Share of gross takings retained as the operator's fee, before VAT.
pub const FEE_SHARE: f64 = 0.72;

/// Splits a VAT-inclusive amount into `(net, vat)`.
pub fn split_vat(gross: f64) -> (f64, f64) {
    let net = gross / (1.0 + STANDARD_VAT_RATE);
    (net, gross - net)
}

fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || value.is_nan() {
        return Err(ValidationError::NegativeAmount {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// One trading day's takings. Keyed by `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFigure {
    pub date: NaiveDate,
    #[serde(default)]
    pub gross_total: f64,
    #[serde(default)]
    pub net_total: f64,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub gross_income: f64,
    #[serde(default)]
    pub net_income: f64,
    #[serde(default)]
    pub vat: f64,
    #[serde(default)]
    pub abbies_pay: f64,
    #[serde(default)]
    pub no_trade: bool,
}

impl DailyFigure {
    /// Derives every monetary field from the till's gross total.
    pub fn from_gross_total(date: NaiveDate, gross_total: f64) -> Result<Self, ValidationError> {
        ensure_non_negative("grossTotal", gross_total)?;
        let fee = gross_total * FEE_SHARE / (1.0 + STANDARD_VAT_RATE);
        let (net_total, _) = split_vat(gross_total);
        let gross_income = gross_total - fee;
        let (net_income, vat) = split_vat(gross_income);
        Ok(Self {
            date,
            gross_total,
            net_total,
            fee,
            gross_income,
            net_income,
            vat,
            abbies_pay: 0.0,
            no_trade: false,
        })
    }

    /// A closed day: flagged `noTrade` with every amount zero.
    pub fn no_trade(date: NaiveDate) -> Self {
        Self {
            date,
            gross_total: 0.0,
            net_total: 0.0,
            fee: 0.0,
            gross_income: 0.0,
            net_income: 0.0,
            vat: 0.0,
            abbies_pay: 0.0,
            no_trade: true,
        }
    }

    /// Applies the `noTrade` rule: a closed day carries no money.
    pub fn normalized(self) -> Self {
        if self.no_trade {
            Self::no_trade(self.date)
        } else {
            self
        }
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.date)
    }
}

/// Month label on a wage record: either a bare month name (`October`) as
/// written by the wages form and payroll import, or an explicit `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WageMonth {
    Key(MonthKey),
    Named(u32),
}

impl WageMonth {
    /// Places the label inside `year`. Named months map to their fiscal slot.
    pub fn resolve(&self, year: FiscalYear) -> MonthKey {
        match self {
            WageMonth::Key(key) => *key,
            WageMonth::Named(number) => year
                .months()
                .into_iter()
                .find(|key| key.month() == *number)
                .unwrap_or(year.months()[0]),
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, WageMonth::Key(_))
    }
}

impl From<MonthKey> for WageMonth {
    fn from(value: MonthKey) -> Self {
        WageMonth::Key(value)
    }
}

impl fmt::Display for WageMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WageMonth::Key(key) => fmt::Display::fmt(key, f),
            WageMonth::Named(number) => f.write_str(month_name(*number).unwrap_or("")),
        }
    }
}

impl FromStr for WageMonth {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Ok(key) = value.parse::<MonthKey>() {
            return Ok(WageMonth::Key(key));
        }
        month_from_name(value)
            .map(WageMonth::Named)
            .ok_or_else(|| ValidationError::InvalidWageMonth(value.to_string()))
    }
}

impl TryFrom<String> for WageMonth {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WageMonth> for String {
    fn from(value: WageMonth) -> Self {
        value.to_string()
    }
}

/// A month's wage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WageRecord {
    pub month: WageMonth,
    #[serde(default)]
    pub net_out: f64,
    #[serde(default)]
    pub invoices: f64,
    #[serde(default)]
    pub hmrc: f64,
    #[serde(default)]
    pub nest: f64,
    #[serde(default)]
    pub deductions: f64,
    /// Stored totals are trusted as-is; payroll imports record cost to employer.
    #[serde(default)]
    pub total: f64,
}

impl WageRecord {
    pub fn new(
        month: impl Into<WageMonth>,
        net_out: f64,
        invoices: f64,
        hmrc: f64,
        nest: f64,
        deductions: f64,
    ) -> Self {
        let mut record = Self {
            month: month.into(),
            net_out,
            invoices,
            hmrc,
            nest,
            deductions,
            total: 0.0,
        };
        record.recalculate_total();
        record
    }

    pub fn recalculate_total(&mut self) {
        self.total = self.net_out + self.invoices + self.hmrc + self.nest + self.deductions;
    }
}

/// An ad-hoc expense. Several may share a date; identity is the synthetic `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SundryExpense {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub vat: f64,
    #[serde(default)]
    pub net: f64,
}

impl SundryExpense {
    pub fn new(date: NaiveDate, amount: f64, vat: f64) -> Result<Self, ValidationError> {
        ensure_non_negative("amount", amount)?;
        ensure_non_negative("vat", vat)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            date,
            amount,
            vat,
            net: amount - vat,
        })
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.date)
    }
}
