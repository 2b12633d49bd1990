use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::StoreConfig;
use crate::models::{
    default_categories, BackupSnapshot, Category, Task, Theme, Timestamp, BACKUP_VERSION,
};
use crate::storage::{KeyValueStore, StorageError};

const TASKS_KEY: &str = "tasks";
const CATEGORIES_KEY: &str = "categories";
const BACKUP_KEY: &str = "backup-";
const THEME_KEY: &str = "theme";

/// Typed access to the task and category collections on top of a [`KeyValueStore`].
///
/// Reads never fail: absent or malformed entries come back as "no data".
/// Writes report their error to the caller after logging it.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    backup_retention: usize,
}

impl Persistence {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            key_prefix: config.key_prefix.clone(),
            backup_retention: config.backup_retention,
        }
    }

    pub fn tasks_key(&self) -> String {
        format!("{}{TASKS_KEY}", self.key_prefix)
    }

    pub fn categories_key(&self) -> String {
        format!("{}{CATEGORIES_KEY}", self.key_prefix)
    }

    fn backup_prefix(&self) -> String {
        format!("{}{BACKUP_KEY}", self.key_prefix)
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.read(key).ok().flatten().unwrap_or_default()
    }

    pub fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StorageError> {
        let result = serde_json::to_string(items)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(key, &json));
        if let Err(err) = &result {
            log::error!("save failed key={key} err={err}");
        }
        result
    }

    pub fn load_tasks(&self) -> Vec<Task> {
        self.load(&self.tasks_key())
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        self.save(&self.tasks_key(), tasks)
    }

    /// Loads categories, seeding and writing the defaults on first launch.
    pub fn load_categories(&self) -> Vec<Category> {
        let key = self.categories_key();
        match self.read(&key) {
            Ok(Some(categories)) => categories,
            Ok(None) => {
                let defaults = default_categories();
                log::info!("seeding default categories count={}", defaults.len());
                // Best-effort; the defaults are still returned if this fails.
                let _ = self.save(&key, &defaults);
                defaults
            }
            Err(_) => default_categories(),
        }
    }

    pub fn save_categories(&self, categories: &[Category]) -> Result<(), StorageError> {
        self.save(&self.categories_key(), categories)
    }

    pub fn load_theme(&self) -> Theme {
        match self.store.get(THEME_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(err) => {
                log::warn!("theme read failed err={err}");
                Theme::default()
            }
        }
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), StorageError> {
        let result = serde_json::to_string(&theme)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(THEME_KEY, &json));
        if let Err(err) = &result {
            log::error!("save failed key={THEME_KEY} err={err}");
        }
        result
    }

    /// Snapshots the stored collections under a timestamped key and prunes old snapshots.
    ///
    /// Returns the key that was written.
    pub fn write_backup(&self, now: Timestamp) -> Result<String, StorageError> {
        let timestamp = now
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace(':', "-");
        let snapshot = BackupSnapshot {
            tasks: self.load_tasks(),
            categories: self.load_categories(),
            timestamp: timestamp.clone(),
            version: BACKUP_VERSION.to_string(),
        };
        let key = format!("{}{timestamp}", self.backup_prefix());
        self.store.set(&key, &serde_json::to_string(&snapshot)?)?;
        self.prune_backups()?;
        log::info!("auto backup created key={key}");
        Ok(key)
    }

    /// Backup keys, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, StorageError> {
        let prefix = self.backup_prefix();
        let mut keys: Vec<String> = self
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        Ok(keys)
    }

    fn prune_backups(&self) -> Result<(), StorageError> {
        let keys = self.list_backups()?;
        for key in keys.iter().skip(self.backup_retention) {
            self.store.remove(key)?;
            log::debug!("backup pruned key={key}");
        }
        Ok(())
    }

    /// `Ok(None)` when the key is absent, `Err` when it is unreadable or malformed.
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>, StorageError> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(err) => {
                log::warn!("load failed key={key} err={err}");
                return Err(err);
            }
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(Some(items)),
            Err(err) => {
                log::warn!("discarding malformed data key={key} err={err}");
                Err(err.into())
            }
        }
    }
}

/// Writes one backup stamped with the current time.
pub fn backup_now(persistence: &Persistence) -> Result<String, StorageError> {
    persistence.write_backup(Utc::now())
}
