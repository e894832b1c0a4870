//! Typed access to one user's fiscal-year collections.

use chrono::NaiveDate;
use pandl_domain::{
    DailyFigure, FiscalYear, FixedCost, FixedCostDocument, MonthKey, MonthlySummary, Schedule,
    SundryExpense, WageMonth, WageRecord,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::{
    storage::{
        write_in_chunks, BatchOp, Collection, CollectionPath, Document, DocumentFilter,
        DocumentStore, WriteMode,
    },
    CoreError,
};

/// Read side the aggregator depends on.
pub trait SourceReader {
    fn fiscal_year(&self) -> FiscalYear;
    /// Figures dated within `start..=end`, `noTrade` days zeroed.
    fn daily_figures_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyFigure>, CoreError>;
    fn wage_for(&self, month: MonthKey) -> Result<Option<WageRecord>, CoreError>;
    fn fixed_costs(&self) -> Result<Vec<FixedCost>, CoreError>;
    fn sundries_in(&self, month: MonthKey) -> Result<Vec<SundryExpense>, CoreError>;
}

/// A decoded summary together with the id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSummary {
    pub id: String,
    pub summary: MonthlySummary,
}

/// A summary document with a usable month whose figures fail to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableSummary {
    pub id: String,
    pub month: MonthKey,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryScan {
    pub readable: Vec<StoredSummary>,
    pub unreadable: Vec<UnreadableSummary>,
}

/// Repository over `users/{user}/years/{fy}/*`.
pub struct YearRepository<'a> {
    store: &'a dyn DocumentStore,
    user: String,
    year: FiscalYear,
}

impl<'a> YearRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore, user: impl Into<String>, year: FiscalYear) -> Self {
        Self {
            store,
            user: user.into(),
            year,
        }
    }

    pub fn year(&self) -> FiscalYear {
        self.year
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    pub fn path(&self, collection: Collection) -> CollectionPath {
        CollectionPath::new(self.user.clone(), self.year, collection)
    }

    /// Repository for the same user in another year.
    pub fn for_year(&self, year: FiscalYear) -> YearRepository<'a> {
        YearRepository::new(self.store, self.user.clone(), year)
    }

    fn put<T: Serialize>(&self, collection: Collection, id: &str, value: &T) -> Result<(), CoreError> {
        let data = serde_json::to_value(value)?;
        self.store
            .put(&self.path(collection), id, data, WriteMode::Replace)
    }

    fn decode<T: DeserializeOwned>(collection: Collection, doc: Document) -> Result<T, CoreError> {
        serde_json::from_value(doc.data).map_err(|err| {
            CoreError::Serde(format!("{collection}/{}: {err}", doc.id))
        })
    }

    pub fn save_daily_figure(&self, figure: &DailyFigure) -> Result<(), CoreError> {
        self.year.require_month(figure.month())?;
        let id = figure.date.format("%Y-%m-%d").to_string();
        self.put(Collection::DailyFigures, &id, figure)
    }

    pub fn daily_figure(&self, date: NaiveDate) -> Result<Option<DailyFigure>, CoreError> {
        let id = date.format("%Y-%m-%d").to_string();
        self.store
            .get(&self.path(Collection::DailyFigures), &id)?
            .map(|doc| Self::decode::<DailyFigure>(Collection::DailyFigures, doc))
            .transpose()
            .map(|figure| figure.map(DailyFigure::normalized))
    }

    pub fn delete_daily_figure(&self, date: NaiveDate) -> Result<(), CoreError> {
        let id = date.format("%Y-%m-%d").to_string();
        self.store.delete(&self.path(Collection::DailyFigures), &id)
    }

    pub fn save_wage(&self, record: &WageRecord) -> Result<(), CoreError> {
        if let WageMonth::Key(key) = record.month {
            self.year.require_month(key)?;
        }
        self.put(Collection::Wages, &record.month.to_string(), record)
    }

    pub fn wages(&self) -> Result<Vec<WageRecord>, CoreError> {
        self.store
            .list(&self.path(Collection::Wages), None)?
            .into_iter()
            .map(|doc| Self::decode(Collection::Wages, doc))
            .collect()
    }

    pub fn delete_wage(&self, month: WageMonth) -> Result<(), CoreError> {
        self.store
            .delete(&self.path(Collection::Wages), &month.to_string())
    }

    pub fn save_fixed_cost(&self, cost: &FixedCost) -> Result<(), CoreError> {
        self.put(Collection::FixedCosts, &cost.service_id, cost)
    }

    pub fn fixed_cost(&self, service_id: &str) -> Result<Option<FixedCost>, CoreError> {
        self.store
            .get(&self.path(Collection::FixedCosts), service_id)?
            .map(Self::decode_fixed_cost)
            .transpose()
    }

    /// Soft-deletes a cost. It keeps accruing through the month of `date`.
    pub fn cancel_fixed_cost(
        &self,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<FixedCost, CoreError> {
        let mut cost = self
            .fixed_cost(service_id)?
            .ok_or_else(|| CoreError::FixedCostNotFound(service_id.to_string()))?;
        cost.cancel(date);
        self.save_fixed_cost(&cost)?;
        Ok(cost)
    }

    pub fn delete_fixed_cost(&self, service_id: &str) -> Result<(), CoreError> {
        self.store
            .delete(&self.path(Collection::FixedCosts), service_id)
    }

    fn decode_fixed_cost(doc: Document) -> Result<FixedCost, CoreError> {
        let id = doc.id.clone();
        let mut raw: FixedCostDocument = Self::decode(Collection::FixedCosts, doc)?;
        raw.service_id.get_or_insert(id);
        Ok(FixedCost::try_from(raw)?)
    }

    pub fn add_sundry(&self, sundry: &SundryExpense) -> Result<String, CoreError> {
        self.year.require_month(sundry.month())?;
        let id = if sundry.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            sundry.id.clone()
        };
        self.put(Collection::Sundries, &id, sundry)?;
        Ok(id)
    }

    pub fn sundries(&self) -> Result<Vec<SundryExpense>, CoreError> {
        self.list_sundries(None)
    }

    pub fn delete_sundry(&self, id: &str) -> Result<(), CoreError> {
        self.store.delete(&self.path(Collection::Sundries), id)
    }

    fn list_sundries(&self, filter: Option<&DocumentFilter>) -> Result<Vec<SundryExpense>, CoreError> {
        self.store
            .list(&self.path(Collection::Sundries), filter)?
            .into_iter()
            .map(|doc| {
                let id = doc.id.clone();
                let mut sundry: SundryExpense = Self::decode(Collection::Sundries, doc)?;
                sundry.id = id;
                Ok(sundry)
            })
            .collect()
    }

    /// Every summary that decodes cleanly. See [`YearRepository::scan_summaries`].
    pub fn summaries(&self) -> Result<Vec<StoredSummary>, CoreError> {
        Ok(self.scan_summaries()?.readable)
    }

    /// Sorts summary documents by whether they decode. Documents without a
    /// readable month are logged and left out entirely.
    pub fn scan_summaries(&self) -> Result<SummaryScan, CoreError> {
        let docs = self
            .store
            .list(&self.path(Collection::MonthlySummaries), None)?;
        let mut scan = SummaryScan::default();
        for doc in docs {
            let Some(month) = doc
                .data
                .get("month")
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse::<MonthKey>().ok())
            else {
                warn!(year = %self.year, id = %doc.id, "summary without a month, skipping");
                continue;
            };
            let id = doc.id.clone();
            match serde_json::from_value::<MonthlySummary>(doc.data) {
                Ok(summary) => scan.readable.push(StoredSummary { id, summary }),
                Err(err) => {
                    warn!(
                        year = %self.year,
                        id = %id,
                        month = %month,
                        error = %err,
                        "unreadable summary"
                    );
                    scan.unreadable.push(UnreadableSummary { id, month });
                }
            }
        }
        Ok(scan)
    }

    pub fn summary(&self, month: MonthKey) -> Result<Option<MonthlySummary>, CoreError> {
        self.store
            .get(&self.path(Collection::MonthlySummaries), &month.to_string())?
            .map(|doc| Self::decode(Collection::MonthlySummaries, doc))
            .transpose()
    }

    /// Full-replace write keyed by month, so stale fields never survive.
    pub fn replace_summary(&self, summary: &MonthlySummary) -> Result<(), CoreError> {
        self.year.require_month(summary.month)?;
        self.put(
            Collection::MonthlySummaries,
            &summary.month.to_string(),
            summary,
        )
    }

    /// Ids of every summary document, readable or not.
    pub fn summary_ids(&self) -> Result<Vec<String>, CoreError> {
        Ok(self
            .store
            .list(&self.path(Collection::MonthlySummaries), None)?
            .into_iter()
            .map(|doc| doc.id)
            .collect())
    }

    /// Deletes `ids` from `collection` in store-sized batches.
    pub fn delete_all(&self, collection: Collection, ids: &[String]) -> Result<usize, CoreError> {
        let path = self.path(collection);
        let ops = ids
            .iter()
            .map(|id| BatchOp::Delete {
                path: path.clone(),
                id: id.clone(),
            })
            .collect();
        write_in_chunks(self.store, ops)
    }
}

impl SourceReader for YearRepository<'_> {
    fn fiscal_year(&self) -> FiscalYear {
        self.year
    }

    fn daily_figures_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyFigure>, CoreError> {
        let filter = DocumentFilter::date_range("date", start, end);
        let mut figures = self
            .store
            .list(&self.path(Collection::DailyFigures), Some(&filter))?
            .into_iter()
            .map(|doc| {
                Self::decode::<DailyFigure>(Collection::DailyFigures, doc)
                    .map(DailyFigure::normalized)
            })
            .collect::<Result<Vec<_>, _>>()?;
        figures.sort_by_key(|figure| figure.date);
        Ok(figures)
    }

    /// An explicit `YYYY-MM` record wins over one labelled by month name.
    fn wage_for(&self, month: MonthKey) -> Result<Option<WageRecord>, CoreError> {
        let mut matches: Vec<WageRecord> = self
            .wages()?
            .into_iter()
            .filter(|record| record.month.resolve(self.year) == month)
            .collect();
        matches.sort_by_key(|record| !record.month.is_explicit());
        if matches.len() > 1 {
            warn!(
                year = %self.year,
                month = %month,
                records = matches.len(),
                kept = %matches[0].month,
                "several wage records for one month"
            );
        }
        Ok(matches.into_iter().next())
    }

    fn fixed_costs(&self) -> Result<Vec<FixedCost>, CoreError> {
        let costs = self
            .store
            .list(&self.path(Collection::FixedCosts), None)?
            .into_iter()
            .map(Self::decode_fixed_cost)
            .collect::<Result<Vec<_>, _>>()?;
        for cost in costs.iter().filter(|c| c.schedule == Schedule::Legacy) {
            warn!(
                year = %self.year,
                service = %cost.service_id,
                "fixed cost has no frequency, charging once per month"
            );
        }
        Ok(costs)
    }

    fn sundries_in(&self, month: MonthKey) -> Result<Vec<SundryExpense>, CoreError> {
        let filter = DocumentFilter::date_range("date", month.first_day(), month.last_day());
        self.list_sundries(Some(&filter))
    }
}
