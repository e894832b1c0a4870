use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{Config, ConfigError};

const CONFIG_FILE_NAME: &str = "pandl.json";
const BACKUP_PREFIX: &str = "pandl";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 10;

/// Loads, saves and snapshots a [`Config`] on disk.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Keeps at most `retention` backups; older ones are pruned after each backup.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        let backups_dir = config_dir.join("backups");
        fs::create_dir_all(&backups_dir)?;
        Ok(Self::new(config_dir.join(CONFIG_FILE_NAME), backups_dir))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Missing file yields defaults.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }
        read_config(&self.config_path)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let tmp = tmp_path(&self.config_path);
        write_atomic(&tmp, &render(config)?)?;
        fs::rename(&tmp, &self.config_path)?;
        Ok(())
    }

    /// Writes a timestamped snapshot and returns its file name.
    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut name = format!("{BACKUP_PREFIX}_{timestamp}");
        if let Some(label) = sanitize_note(note) {
            name.push('_');
            name.push_str(&label);
        }
        name.push('.');
        name.push_str(BACKUP_EXTENSION);
        write_atomic(&self.backups_dir.join(&name), &render(config)?)?;
        self.prune()?;
        Ok(name)
    }

    /// Reads a snapshot back and makes it the active configuration.
    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        let path = self.backups_dir.join(backup_name);
        if !path.is_file() {
            return Err(ConfigError::BackupNotFound(backup_name.to_string()));
        }
        let config = read_config(&path)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort_by(|a, b| {
            Reverse(parse_timestamp(a))
                .cmp(&Reverse(parse_timestamp(b)))
                .then_with(|| b.cmp(a))
        });
        Ok(entries)
    }

    fn prune(&self) -> Result<(), ConfigError> {
        for stale in self.list_backups()?.into_iter().skip(self.retention) {
            fs::remove_file(self.backups_dir.join(stale))?;
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
}

fn render(config: &Config) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(config).map_err(|err| ConfigError::Serde(err.to_string()))
}

fn sanitize_note(note: Option<&str>) -> Option<String> {
    let mut sanitized = String::new();
    for ch in note?.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
        } else if !sanitized.is_empty() && !sanitized.ends_with('-') {
            sanitized.push('-');
        }
    }
    let trimmed = sanitized.trim_matches('-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reads the `YYYYMMDD_HHMMSS` stamp that follows the prefix.
fn parse_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(&format!(".{BACKUP_EXTENSION}"))?;
    let rest = stem.strip_prefix(&format!("{BACKUP_PREFIX}_"))?;
    let raw = rest.get(..15)?;
    NaiveDateTime::parse_from_str(raw, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
