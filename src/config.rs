//! Configuration loading.
//!
//! The data directory is resolved first (flag, `TASK_LIST_DIR`, `~/.tasklist`),
//! then an optional `config.json` inside it is read. Missing fields take
//! their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::TASKS_KEY;
use crate::store::StoreOptions;

pub const CONFIG_FILE: &str = "config.json";
pub const DIR_ENV: &str = "TASK_LIST_DIR";

/// Settings read from `<data_dir>/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key the task list is stored under.
    pub storage_key: String,

    /// Drop snapshots older than the last one written.
    pub ordered_writes: bool,

    /// Log file name (relative to the data dir) used while the UI is up.
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_key: TASKS_KEY.to_string(),
            ordered_writes: false,
            log_file: "tasklist.log".to_string(),
        }
    }
}

impl Config {
    /// Load `config.json` from `data_dir`, or defaults if there is none.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from_file(&path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            key: self.storage_key.clone(),
            ordered_writes: self.ordered_writes,
        }
    }

    pub fn log_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.log_file)
    }
}

/// Pick the data directory from the flag, the environment, or `$HOME`.
pub fn resolve_data_dir(flag: Option<&Path>) -> PathBuf {
    resolve_data_dir_from(
        flag,
        std::env::var(DIR_ENV).ok(),
        std::env::var("HOME").ok(),
    )
}

fn resolve_data_dir_from(
    flag: Option<&Path>,
    env_dir: Option<String>,
    home: Option<String>,
) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = env_dir.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    match home {
        Some(home) => PathBuf::from(home).join(".tasklist"),
        None => PathBuf::from("."),
    }
}
