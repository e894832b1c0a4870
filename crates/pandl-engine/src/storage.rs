//! Document-store abstraction the engine persists through.

use std::fmt;

use chrono::NaiveDate;
use pandl_domain::{parse_date, FiscalYear};
use serde_json::Value;

use crate::CoreError;

/// Largest batch a single atomic write may carry.
pub const DEFAULT_MAX_BATCH_OPS: usize = 500;

/// Per-year collections held under `users/{user}/years/{fy}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    DailyFigures,
    Wages,
    FixedCosts,
    Sundries,
    MonthlySummaries,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::DailyFigures,
        Collection::Wages,
        Collection::FixedCosts,
        Collection::Sundries,
        Collection::MonthlySummaries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::DailyFigures => "dailyFigures",
            Collection::Wages => "wages",
            Collection::FixedCosts => "fixedCosts",
            Collection::Sundries => "sundries",
            Collection::MonthlySummaries => "monthlySummaries",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully-qualified location of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    pub user: String,
    pub year: FiscalYear,
    pub collection: Collection,
}

impl CollectionPath {
    pub fn new(user: impl Into<String>, year: FiscalYear, collection: Collection) -> Self {
        Self {
            user: user.into(),
            year,
            collection,
        }
    }

    /// Path components, outermost first.
    pub fn segments(&self) -> [String; 5] {
        [
            "users".into(),
            self.user.clone(),
            "years".into(),
            self.year.to_string(),
            self.collection.as_str().into(),
        ]
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join("/"))
    }
}

/// A stored document and its id within the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// How a put treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Overwrite the whole document. Fields absent from the payload are dropped.
    #[default]
    Replace,
    /// Overlay top-level fields onto the existing document.
    Merge,
}

/// Server-side filter applied by [`DocumentStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// Inclusive date range on a `YYYY-MM-DD` string field.
    DateRange {
        field: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl DocumentFilter {
    pub fn date_range(field: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        DocumentFilter::DateRange {
            field: field.into(),
            start,
            end,
        }
    }

    pub fn matches(&self, data: &Value) -> bool {
        match self {
            DocumentFilter::DateRange { field, start, end } => data
                .get(field)
                .and_then(Value::as_str)
                .and_then(|raw| parse_date(raw).ok())
                .map(|date| *start <= date && date <= *end)
                .unwrap_or(false),
        }
    }
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Put {
        path: CollectionPath,
        id: String,
        data: Value,
        mode: WriteMode,
    },
    Delete {
        path: CollectionPath,
        id: String,
    },
}

/// Abstraction over backends holding the per-user, per-year collections.
pub trait DocumentStore: Send + Sync {
    fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, CoreError>;
    /// Documents ordered by id.
    fn list(
        &self,
        path: &CollectionPath,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, CoreError>;
    fn put(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Value,
        mode: WriteMode,
    ) -> Result<(), CoreError>;
    /// Deleting a missing document succeeds.
    fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), CoreError>;
    /// Applies every op or none. Rejects batches over [`DocumentStore::max_batch_ops`].
    fn batch_write(&self, ops: Vec<BatchOp>) -> Result<(), CoreError>;

    fn max_batch_ops(&self) -> usize {
        DEFAULT_MAX_BATCH_OPS
    }
}

/// Writes `ops` as consecutive batches no larger than the store limit.
/// Chunks already committed stay committed if a later one fails.
pub fn write_in_chunks(store: &dyn DocumentStore, ops: Vec<BatchOp>) -> Result<usize, CoreError> {
    let limit = store.max_batch_ops().max(1);
    let mut batches = 0;
    let mut pending = ops.into_iter().peekable();
    while pending.peek().is_some() {
        let chunk: Vec<BatchOp> = pending.by_ref().take(limit).collect();
        tracing::debug!(ops = chunk.len(), batch = batches + 1, "committing batch");
        store.batch_write(chunk)?;
        batches += 1;
    }
    Ok(batches)
}

/// Shallow overlay used by [`WriteMode::Merge`]. Non-object payloads replace outright.
pub fn merge_documents(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(fields)) => {
            for (key, value) in fields {
                current.insert(key, value);
            }
        }
        (slot, other) => *slot = other,
    }
}

/// Rejects batches larger than `limit` before anything is applied.
pub fn ensure_batch_size(ops: &[BatchOp], limit: usize) -> Result<(), CoreError> {
    if ops.len() > limit {
        return Err(CoreError::BatchTooLarge {
            requested: ops.len(),
            limit,
        });
    }
    Ok(())
}
