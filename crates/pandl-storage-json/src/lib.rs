use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use pandl_engine::{
    storage::{ensure_batch_size, merge_documents},
    BatchOp, CollectionPath, CoreError, Document, DocumentFilter, DocumentStore, WriteMode,
    DEFAULT_MAX_BATCH_OPS,
};
use serde_json::Value;

const DOCUMENT_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// Filesystem-backed document store. One pretty-printed JSON file per document,
/// laid out as `{root}/users/{user}/years/{fy}/{collection}/{id}.json`.
pub struct JsonDocumentStore {
    root: PathBuf,
    max_batch_ops: usize,
    write_lock: Mutex<()>,
}

impl JsonDocumentStore {
    pub fn new(root: PathBuf) -> Result<Self, CoreError> {
        Self::with_max_batch_ops(root, DEFAULT_MAX_BATCH_OPS)
    }

    pub fn with_max_batch_ops(root: PathBuf, max_batch_ops: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_batch_ops: max_batch_ops.max(1),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_dir(&self, path: &CollectionPath) -> PathBuf {
        path.segments()
            .iter()
            .fold(self.root.clone(), |dir, segment| {
                dir.join(path_segment(segment))
            })
    }

    pub fn document_path(&self, path: &CollectionPath, id: &str) -> PathBuf {
        self.collection_dir(path)
            .join(format!("{}.{}", encode_id(id), DOCUMENT_EXTENSION))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.write_lock
            .lock()
            .map_err(|_| CoreError::Storage("json store lock poisoned".into()))
    }

    /// Resolves each op against disk state and earlier ops in the same batch.
    fn stage(&self, ops: Vec<BatchOp>) -> Result<BTreeMap<PathBuf, Option<Value>>, CoreError> {
        let mut staged: BTreeMap<PathBuf, Option<Value>> = BTreeMap::new();
        for op in ops {
            match op {
                BatchOp::Put {
                    path,
                    id,
                    data,
                    mode,
                } => {
                    let file = self.document_path(&path, &id);
                    let next = match mode {
                        WriteMode::Replace => data,
                        WriteMode::Merge => {
                            let current = match staged.get(&file) {
                                Some(pending) => pending.clone(),
                                None => read_document(&file)?,
                            };
                            match current {
                                Some(mut existing) => {
                                    merge_documents(&mut existing, data);
                                    existing
                                }
                                None => data,
                            }
                        }
                    };
                    staged.insert(file, Some(next));
                }
                BatchOp::Delete { path, id } => {
                    staged.insert(self.document_path(&path, &id), None);
                }
            }
        }
        Ok(staged)
    }

    fn commit(staged: BTreeMap<PathBuf, Option<Value>>) -> Result<(), CoreError> {
        let mut rendered = Vec::with_capacity(staged.len());
        for (file, value) in staged {
            let text = value.map(|v| serde_json::to_string_pretty(&v)).transpose()?;
            rendered.push((file, text));
        }
        for (file, text) in rendered {
            match text {
                Some(text) => write_document(&file, &text)?,
                None => remove_document(&file)?,
            }
        }
        Ok(())
    }
}

impl DocumentStore for JsonDocumentStore {
    fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Document>, CoreError> {
        Ok(read_document(&self.document_path(path, id))?.map(|data| Document {
            id: id.to_string(),
            data,
        }))
    }

    fn list(
        &self,
        path: &CollectionPath,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, CoreError> {
        let dir = self.collection_dir(path);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut docs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file = entry.path();
            if !file.is_file() {
                continue;
            }
            if file.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let Some(stem) = file.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let Some(data) = read_document(&file)? else {
                continue;
            };
            if filter.map_or(true, |f| f.matches(&data)) {
                docs.push(Document {
                    id: decode_id(stem),
                    data,
                });
            }
        }
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    fn put(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Value,
        mode: WriteMode,
    ) -> Result<(), CoreError> {
        let _guard = self.lock()?;
        let staged = self.stage(vec![BatchOp::Put {
            path: path.clone(),
            id: id.to_string(),
            data,
            mode,
        }])?;
        Self::commit(staged)
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), CoreError> {
        let _guard = self.lock()?;
        remove_document(&self.document_path(path, id))
    }

    /// Every op is resolved and serialized before the first file is touched.
    fn batch_write(&self, ops: Vec<BatchOp>) -> Result<(), CoreError> {
        ensure_batch_size(&ops, self.max_batch_ops)?;
        let _guard = self.lock()?;
        let staged = self.stage(ops)?;
        Self::commit(staged)
    }

    fn max_batch_ops(&self) -> usize {
        self.max_batch_ops
    }
}

fn read_document(path: &Path) -> Result<Option<Value>, CoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(
            serde_json::from_str(&text).map_err(|err| CoreError::Serde(err.to_string()))?,
        )),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_document(path: &Path, data: &str) -> Result<(), CoreError> {
    let tmp = tmp_path(path);
    write_atomic(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_document(path: &Path) -> Result<(), CoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Directory name for one path segment. Uses the id escaping so distinct
/// users never share a directory; the empty segment becomes a lone `%`.
fn path_segment(segment: &str) -> String {
    if segment.is_empty() {
        "%".into()
    } else {
        encode_id(segment)
    }
}

/// Escapes anything outside `[A-Za-z0-9-_]` as `%XX` so ids survive as file names.
fn encode_id(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => encoded.push(byte as char),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

fn decode_id(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            if let Some(byte) = stem
                .get(idx + 1..idx + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                decoded.push(byte);
                idx += 3;
                continue;
            }
        }
        decoded.push(bytes[idx]);
        idx += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_file_names() {
        for id in ["2024-10", "card machine", "a/b", "50%", "caf\u{e9}"] {
            assert_eq!(decode_id(&encode_id(id)), id);
        }
        assert_eq!(encode_id("a b"), "a%20b");
    }

    #[test]
    fn user_segments_stay_distinct() {
        let root = PathBuf::from("/data");
        let store = JsonDocumentStore {
            root: root.clone(),
            max_batch_ops: DEFAULT_MAX_BATCH_OPS,
            write_lock: Mutex::new(()),
        };
        let year: pandl_domain::FiscalYear = "2024-25".parse().unwrap();
        let dir = |user: &str| {
            store.collection_dir(&CollectionPath::new(
                user,
                year,
                pandl_engine::Collection::Sundries,
            ))
        };
        assert_ne!(dir("a.b"), dir("a_b"));
        assert_ne!(dir(""), dir("_"));
        assert_eq!(dir("a.b"), root.join("users/a%2Eb/years/2024-25/sundries"));
        assert!(dir("..").starts_with(root.join("users")));
        assert_eq!(dir(".."), root.join("users/%2E%2E/years/2024-25/sundries"));
    }
}
