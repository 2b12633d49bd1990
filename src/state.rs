use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::events::{Notice, Notifier};
use crate::models::{FilterPatch, Task, TaskDraft, TaskFilter, TaskPatch, TaskStats};
use crate::persistence::Persistence;
use crate::storage::StorageError;
use crate::views;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("storage error: {0}")]
    Persistence(#[from] StorageError),
}

impl StateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub total: usize,
    pub active: usize,
}

/// Owns the task collection and the list filter.
///
/// Every mutation is staged on a copy of the collection, written through
/// [`Persistence`], and only then committed in memory; a failed write leaves
/// the in-memory tasks untouched.
pub struct TaskState {
    tasks: Vec<Task>,
    filter: TaskFilter,
    persistence: Persistence,
    notifier: Arc<dyn Notifier>,
}

impl TaskState {
    pub fn new(tasks: Vec<Task>, persistence: Persistence, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            tasks,
            filter: TaskFilter::default(),
            persistence,
            notifier,
        }
    }

    pub fn load(persistence: Persistence, notifier: Arc<dyn Notifier>) -> Self {
        let tasks = persistence.load_tasks();
        log::info!("tasks loaded count={}", tasks.len());
        Self::new(tasks, persistence, notifier)
    }

    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task, StateError> {
        let task = Task::from_draft(self.fresh_id(), Utc::now(), draft);
        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(
            next,
            "Failed to add task",
            "Your task couldn't be saved. Please try again.",
        )?;
        log::debug!("task added id={}", task.id);
        self.notifier.notify(Notice::success(
            "Task added successfully",
            format!("\"{}\" has been added", task.title),
        ));
        Ok(task)
    }

    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<Task, StateError> {
        let Some(index) = self.position(task_id) else {
            return Err(self.not_found(
                task_id,
                "Task not found",
                "The task you're trying to update doesn't exist.",
            ));
        };
        let completion = patch.completed;
        let mut next = self.tasks.clone();
        next[index].apply(patch);
        let updated = next[index].clone();
        self.commit(
            next,
            "Failed to update task",
            "Your task couldn't be updated. Please try again.",
        )?;
        log::debug!("task updated id={task_id}");
        let notice = match completion {
            Some(true) => Notice::success("Task completed", format!("\"{}\"", updated.title)),
            Some(false) => {
                Notice::success("Task marked as active", format!("\"{}\"", updated.title))
            }
            None => Notice::success(
                "Task updated",
                format!("\"{}\" has been updated", updated.title),
            ),
        };
        self.notifier.notify(notice);
        Ok(updated)
    }

    pub fn toggle_completion(&mut self, task_id: &str) -> Result<Task, StateError> {
        let Some(completed) = self.get(task_id).map(|task| task.completed) else {
            return Err(self.not_found(
                task_id,
                "Task not found",
                "The task you're trying to update doesn't exist.",
            ));
        };
        self.update_task(task_id, TaskPatch::completed(!completed))
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<Task, StateError> {
        let Some(index) = self.position(task_id) else {
            return Err(self.not_found(
                task_id,
                "Task not found",
                "The task you're trying to delete doesn't exist.",
            ));
        };
        let mut next = self.tasks.clone();
        let removed = next.remove(index);
        self.commit(
            next,
            "Failed to delete task",
            "Your task couldn't be deleted. Please try again.",
        )?;
        log::debug!("task deleted id={task_id}");
        self.notifier.notify(Notice::success(
            "Task deleted",
            format!("\"{}\" has been removed", removed.title),
        ));
        Ok(removed)
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn update_filter(&mut self, patch: FilterPatch) {
        self.filter.apply(patch);
    }

    pub fn reset_filter(&mut self) {
        self.filter = TaskFilter::default();
    }

    /// The task list as the current filter shows it. Recomputed on every call.
    pub fn filtered_tasks(&self) -> Vec<Task> {
        views::filter_tasks(&self.tasks, &self.filter)
    }

    pub fn stats(&self) -> TaskStats {
        self.stats_at(&Local::now())
    }

    pub fn stats_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> TaskStats {
        views::compute_stats(&self.tasks, now)
    }

    /// Tasks due on a local calendar day, for the calendar view.
    pub fn tasks_due_on(&self, date: NaiveDate) -> Vec<Task> {
        views::tasks_due_on(&self.tasks, date, &Local)
    }

    pub fn category_counts(&self, category_id: &str) -> CategoryCounts {
        self.tasks
            .iter()
            .filter(|task| task.category_id.as_deref() == Some(category_id))
            .fold(CategoryCounts::default(), |mut counts, task| {
                counts.total += 1;
                if !task.completed {
                    counts.active += 1;
                }
                counts
            })
    }

    fn position(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == task_id)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }

    fn commit(
        &mut self,
        next: Vec<Task>,
        title: &str,
        description: &str,
    ) -> Result<(), StateError> {
        if let Err(err) = self.persistence.save_tasks(&next) {
            self.notifier.notify(Notice::error(title, description));
            return Err(err.into());
        }
        self.tasks = next;
        Ok(())
    }

    fn not_found(&self, task_id: &str, title: &str, description: &str) -> StateError {
        log::debug!("task not found id={task_id}");
        self.notifier.notify(Notice::error(title, description));
        StateError::NotFound {
            kind: "task",
            id: task_id.to_string(),
        }
    }
}
