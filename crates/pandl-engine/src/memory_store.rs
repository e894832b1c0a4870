//! In-process [`DocumentStore`] used by tests, benches and short-lived tools.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use serde_json::Value;

use crate::{
    storage::{
        ensure_batch_size, merge_documents, BatchOp, CollectionPath, Document, DocumentFilter,
        DocumentStore, WriteMode, DEFAULT_MAX_BATCH_OPS,
    },
    CoreError,
};

type Collections = BTreeMap<CollectionPath, BTreeMap<String, Value>>;

#[derive(Debug, Default)]
struct State {
    collections: Collections,
    /// Successful write calls remaining before writes start failing.
    writes_before_failure: Option<usize>,
    write_calls: usize,
}

/// Thread-safe map-backed store. Batches are applied under one lock.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    state: Mutex<State>,
    max_batch_ops: usize,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_max_batch_ops(DEFAULT_MAX_BATCH_OPS)
    }

    pub fn with_max_batch_ops(max_batch_ops: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_batch_ops: max_batch_ops.max(1),
        }
    }

    /// Lets `successful` more write calls through, then fails every write.
    pub fn fail_writes_after(&self, successful: usize) -> Result<(), CoreError> {
        self.lock()?.writes_before_failure = Some(successful);
        Ok(())
    }

    pub fn restore_writes(&self) -> Result<(), CoreError> {
        self.lock()?.writes_before_failure = None;
        Ok(())
    }

    /// Number of `put`, `delete` and `batch_write` calls accepted so far.
    pub fn write_calls(&self) -> Result<usize, CoreError> {
        Ok(self.lock()?.write_calls)
    }

    pub fn len(&self, path: &CollectionPath) -> Result<usize, CoreError> {
        Ok(self
            .lock()?
            .collections
            .get(path)
            .map(BTreeMap::len)
            .unwrap_or(0))
    }

    pub fn is_empty(&self, path: &CollectionPath) -> Result<bool, CoreError> {
        Ok(self.len(path)? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CoreError> {
        self.state
            .lock()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))
    }

    fn begin_write(state: &mut State) -> Result<(), CoreError> {
        match state.writes_before_failure {
            Some(0) => Err(CoreError::Storage("injected write failure".into())),
            Some(remaining) => {
                state.writes_before_failure = Some(remaining - 1);
                state.write_calls += 1;
                Ok(())
            }
            None => {
                state.write_calls += 1;
                Ok(())
            }
        }
    }

    fn apply(collections: &mut Collections, op: BatchOp) {
        match op {
            BatchOp::Put {
                path,
                id,
                data,
                mode,
            } => {
                let docs = collections.entry(path).or_default();
                if mode == WriteMode::Merge {
                    if let Some(existing) = docs.get_mut(&id) {
                        merge_documents(existing, data);
                        return;
                    }
                }
                docs.insert(id, data);
            }
            BatchOp::Delete { path, id } => {
                if let Some(docs) = collections.get_mut(&path) {
                    docs.remove(&id);
                }
            }
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, CoreError> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(path)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    fn list(
        &self,
        path: &CollectionPath,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, CoreError> {
        let state = self.lock()?;
        let Some(docs) = state.collections.get(path) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, data)| filter.map_or(true, |f| f.matches(data)))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    fn put(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Value,
        mode: WriteMode,
    ) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        Self::begin_write(&mut state)?;
        Self::apply(
            &mut state.collections,
            BatchOp::Put {
                path: path.clone(),
                id: id.to_string(),
                data,
                mode,
            },
        );
        Ok(())
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        Self::begin_write(&mut state)?;
        Self::apply(
            &mut state.collections,
            BatchOp::Delete {
                path: path.clone(),
                id: id.to_string(),
            },
        );
        Ok(())
    }

    fn batch_write(&self, ops: Vec<BatchOp>) -> Result<(), CoreError> {
        ensure_batch_size(&ops, self.max_batch_ops)?;
        let mut state = self.lock()?;
        Self::begin_write(&mut state)?;
        for op in ops {
            Self::apply(&mut state.collections, op);
        }
        Ok(())
    }

    fn max_batch_ops(&self) -> usize {
        self.max_batch_ops
    }
}
