//! State layer for a single-user task and category manager: in-memory
//! collections backed by a key-value store, list filtering and sorting,
//! dashboard statistics and a periodic snapshot writer.

mod categories;
mod config;
mod events;
pub mod logging;
mod models;
mod persistence;
mod scheduler;
mod session;
mod state;
mod storage;
pub mod views;

pub use crate::categories::CategoryState;
pub use crate::config::StoreConfig;
pub use crate::events::{LogNotifier, Notice, NoticeLevel, Notifier};
pub use crate::models::*;
pub use crate::persistence::{backup_now, Persistence};
pub use crate::scheduler::BackupTimer;
pub use crate::session::Session;
pub use crate::state::{CategoryCounts, StateError, TaskState};
pub use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
