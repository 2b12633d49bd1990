use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Prepended to the tasks, categories and backup keys. `theme` is never prefixed.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_auto_backup")]
    pub auto_backup: bool,
    #[serde(default = "default_backup_interval_secs")]
    pub backup_interval_secs: u64,
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            auto_backup: default_auto_backup(),
            backup_interval_secs: default_backup_interval_secs(),
            backup_retention: default_backup_retention(),
        }
    }
}

impl StoreConfig {
    /// Reads a JSON config file. A missing or unreadable file yields the defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                log::debug!("config not read path={} err={err}", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("config ignored path={} err={err}", path.display());
                Self::default()
            }
        }
    }

    pub fn backup_interval(&self) -> Duration {
        // A zero period would make the interval panic.
        Duration::from_secs(self.backup_interval_secs.max(1))
    }
}

fn default_key_prefix() -> String {
    "imanes-tasks:".to_string()
}

fn default_auto_backup() -> bool {
    true
}

fn default_backup_interval_secs() -> u64 {
    30
}

fn default_backup_retention() -> usize {
    5
}
