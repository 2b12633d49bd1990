use std::path::PathBuf;
use std::sync::Arc;

use crate::categories::CategoryState;
use crate::config::StoreConfig;
use crate::events::{LogNotifier, Notifier};
#[cfg(feature = "file-log")]
use crate::logging;
use crate::models::{Category, Theme};
use crate::persistence::Persistence;
use crate::scheduler::BackupTimer;
use crate::state::TaskState;
use crate::storage::{FileStore, KeyValueStore, StorageError};

/// Everything one user session needs: both state managers, the theme
/// preference and the auto-backup timer. Closing (or dropping) the session
/// stops the timer.
pub struct Session {
    persistence: Persistence,
    tasks: TaskState,
    categories: CategoryState,
    theme: Theme,
    backups: Option<BackupTimer>,
    #[cfg(feature = "file-log")]
    logger: Option<flexi_logger::LoggerHandle>,
}

impl Session {
    /// Loads both collections and, when enabled and a tokio runtime is
    /// available, starts the backup timer.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        config: &StoreConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let persistence = Persistence::new(store, config);
        let tasks = TaskState::load(persistence.clone(), notifier.clone());
        let categories = CategoryState::load(persistence.clone(), notifier);
        let theme = persistence.load_theme();
        let backups = if config.auto_backup {
            BackupTimer::start(persistence.clone(), config.backup_interval())
        } else {
            None
        };
        Self {
            persistence,
            tasks,
            categories,
            theme,
            backups,
            #[cfg(feature = "file-log")]
            logger: None,
        }
    }

    /// Opens a session over a [`FileStore`] rooted at `data_dir`, reporting notices to the log.
    pub fn open_dir(data_dir: PathBuf, config: &StoreConfig) -> Result<Self, StorageError> {
        let store = FileStore::new(data_dir);
        store.ensure_dirs()?;
        Ok(Self::open(Arc::new(store), config, Arc::new(LogNotifier)))
    }

    /// Like [`Session::open_dir`], but first routes the `log` records to
    /// rotating files under `data_dir/logs`. A session still opens when the
    /// logger cannot start, e.g. because the host installed its own.
    #[cfg(feature = "file-log")]
    pub fn open_dir_with_logging(
        data_dir: PathBuf,
        config: &StoreConfig,
    ) -> Result<Self, StorageError> {
        let logger = match logging::init_logging(&data_dir) {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::warn!("file logging not started err={err}");
                None
            }
        };
        let mut session = Self::open_dir(data_dir, config)?;
        session.logger = logger;
        Ok(session)
    }

    pub fn tasks(&self) -> &TaskState {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskState {
        &mut self.tasks
    }

    pub fn categories(&self) -> &CategoryState {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CategoryState {
        &mut self.categories
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Category shown for a task; `None` when the task is missing, uncategorized
    /// or points at a deleted category.
    pub fn category_of(&self, task_id: &str) -> Option<&Category> {
        let task = self.tasks.get(task_id)?;
        self.categories.resolve(task)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StorageError> {
        self.persistence.save_theme(theme)?;
        self.theme = theme;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, StorageError> {
        let next = self.theme.toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn backups_running(&self) -> bool {
        self.backups.as_ref().is_some_and(BackupTimer::is_running)
    }

    /// Stops the backup timer. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut timer) = self.backups.take() {
            timer.stop();
        }
        #[cfg(feature = "file-log")]
        if let Some(logger) = &self.logger {
            logger.flush();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::tests::RecordingNotifier;
    use crate::models::{default_categories, FilterPatch, StatusFilter, TaskDraft, TaskFilter};
    use crate::storage::MemoryStore;
    use std::time::Duration;

    fn no_backups() -> StoreConfig {
        StoreConfig {
            auto_backup: false,
            ..StoreConfig::default()
        }
    }

    #[test]
    fn open_loads_defaults_for_a_fresh_store() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::open(store, &no_backups(), Arc::new(RecordingNotifier::default()));

        assert!(session.tasks().all_tasks().is_empty());
        assert_eq!(session.tasks().filter(), &TaskFilter::default());
        assert_eq!(session.categories().categories(), default_categories().as_slice());
        assert_eq!(session.theme(), Theme::Light);
        assert!(!session.backups_running());
    }

    #[test]
    fn data_survives_reopening_but_the_filter_does_not() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let task_id = {
            let mut session = Session::open(store.clone(), &no_backups(), notifier.clone());
            let task = session
                .tasks_mut()
                .add_task(TaskDraft {
                    title: "Renew passport".to_string(),
                    category_id: Some("1".to_string()),
                    ..TaskDraft::default()
                })
                .unwrap();
            session.tasks_mut().update_filter(FilterPatch {
                status: Some(StatusFilter::Completed),
                ..FilterPatch::default()
            });
            assert_eq!(session.toggle_theme().unwrap(), Theme::Dark);
            task.id
        };

        let session = Session::open(store, &no_backups(), notifier);
        assert_eq!(session.tasks().all_tasks().len(), 1);
        assert_eq!(session.tasks().filter().status, StatusFilter::All);
        assert_eq!(session.theme(), Theme::Dark);
        assert_eq!(
            session.category_of(&task_id).map(|c| c.name.as_str()),
            Some("Personal")
        );
        assert!(session.category_of("missing").is_none());
    }

    #[test]
    fn open_dir_persists_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        {
            let mut session = Session::open_dir(root.clone(), &no_backups()).unwrap();
            session
                .tasks_mut()
                .add_task(TaskDraft::new("From disk"))
                .unwrap();
        }
        let session = Session::open_dir(root, &no_backups()).unwrap();
        assert_eq!(session.tasks().all_tasks()[0].title, "From disk");
        assert_eq!(session.categories().categories().len(), 4);
    }

    #[cfg(feature = "file-log")]
    #[test]
    fn open_dir_with_logging_keeps_logs_out_of_the_store() {
        let dir = tempfile::tempdir().unwrap().keep();
        let root = dir.join("store");

        let mut session = Session::open_dir_with_logging(root.clone(), &no_backups()).unwrap();
        session
            .tasks_mut()
            .add_task(TaskDraft::new("Logged"))
            .unwrap();
        session.close();

        assert!(logging::log_directory(&root).is_dir());
        let keys = FileStore::new(root).keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|key| key.starts_with("imanes-tasks:")));
        assert_eq!(session.tasks().all_tasks().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backup_timer_runs_for_the_session_lifetime() {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::open(
            store,
            &StoreConfig::default(),
            Arc::new(RecordingNotifier::default()),
        );
        assert!(session.backups_running());

        tokio::time::sleep(Duration::from_secs(31)).await;
        let backups = session.persistence().list_backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("imanes-tasks:backup-"));

        session.close();
        session.close();
        assert!(!session.backups_running());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(session.persistence().list_backups().unwrap().len(), 1);
    }
}
