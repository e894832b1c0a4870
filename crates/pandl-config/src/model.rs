use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_ID: &str = "default";
pub const DEFAULT_LOG_FILTER: &str = "pandl_core=info,pandl_engine=info";
pub const DEFAULT_MAX_BATCH_OPS: usize = 500;
const DATA_DIR_NAME: &str = "PandL";

/// Settings read at start-up. Unknown or missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "Config::default_user_id")]
    pub user_id: String,

    /// Root of the JSON document store. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,

    #[serde(default = "Config::default_max_batch_ops")]
    pub max_batch_ops: usize,

    #[serde(default = "Config::default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: Self::default_user_id(),
            data_root: None,
            max_batch_ops: Self::default_max_batch_ops(),
            log_filter: Self::default_log_filter(),
        }
    }
}

impl Config {
    pub fn default_user_id() -> String {
        DEFAULT_USER_ID.into()
    }

    pub fn default_max_batch_ops() -> usize {
        DEFAULT_MAX_BATCH_OPS
    }

    pub fn default_log_filter() -> String {
        DEFAULT_LOG_FILTER.into()
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join(DATA_DIR_NAME)
    }

    /// Batch limit actually handed to stores; zero is treated as one.
    pub fn effective_max_batch_ops(&self) -> usize {
        self.max_batch_ops.max(1)
    }
}
