use std::sync::Arc;

use uuid::Uuid;

use crate::events::{Notice, Notifier};
use crate::models::{Category, CategoryDraft, CategoryPatch, Task};
use crate::persistence::Persistence;
use crate::state::StateError;

/// Owns the category collection. Deleting a category never touches tasks;
/// their references simply stop resolving.
pub struct CategoryState {
    categories: Vec<Category>,
    persistence: Persistence,
    notifier: Arc<dyn Notifier>,
}

impl CategoryState {
    pub fn new(
        categories: Vec<Category>,
        persistence: Persistence,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            categories,
            persistence,
            notifier,
        }
    }

    pub fn load(persistence: Persistence, notifier: Arc<dyn Notifier>) -> Self {
        let categories = persistence.load_categories();
        log::info!("categories loaded count={}", categories.len());
        Self::new(categories, persistence, notifier)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get_by_id(&self, category_id: Option<&str>) -> Option<&Category> {
        let category_id = category_id?;
        self.categories.iter().find(|category| category.id == category_id)
    }

    /// The category a task points at; `None` for uncategorized or dangling references.
    pub fn resolve(&self, task: &Task) -> Option<&Category> {
        self.get_by_id(task.category_id.as_deref())
    }

    pub fn add_category(&mut self, draft: CategoryDraft) -> Result<Category, StateError> {
        let category = Category::from_draft(self.fresh_id(), draft);
        let mut next = self.categories.clone();
        next.push(category.clone());
        self.commit(
            next,
            "Failed to add category",
            "Your category couldn't be saved. Please try again.",
        )?;
        self.notifier.notify(Notice::success(
            "Category added",
            format!("\"{}\" has been added", category.name),
        ));
        Ok(category)
    }

    pub fn update_category(
        &mut self,
        category_id: &str,
        patch: CategoryPatch,
    ) -> Result<Category, StateError> {
        let Some(index) = self.position(category_id) else {
            return Err(self.not_found(
                category_id,
                "The category you're trying to update doesn't exist.",
            ));
        };
        let mut next = self.categories.clone();
        next[index].apply(patch);
        let updated = next[index].clone();
        self.commit(
            next,
            "Failed to update category",
            "Your category couldn't be updated. Please try again.",
        )?;
        self.notifier.notify(Notice::success(
            "Category updated",
            format!("\"{}\" has been updated", updated.name),
        ));
        Ok(updated)
    }

    pub fn delete_category(&mut self, category_id: &str) -> Result<Category, StateError> {
        let Some(index) = self.position(category_id) else {
            return Err(self.not_found(
                category_id,
                "The category you're trying to delete doesn't exist.",
            ));
        };
        let mut next = self.categories.clone();
        let removed = next.remove(index);
        self.commit(
            next,
            "Failed to delete category",
            "Your category couldn't be deleted. Please try again.",
        )?;
        log::debug!("category deleted id={category_id}");
        self.notifier.notify(Notice::success(
            "Category deleted",
            format!("\"{}\" has been removed", removed.name),
        ));
        Ok(removed)
    }

    fn position(&self, category_id: &str) -> Option<usize> {
        self.categories
            .iter()
            .position(|category| category.id == category_id)
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
        next: Vec<Category>,
        title: &str,
        description: &str,
    ) -> Result<(), StateError> {
        if let Err(err) = self.persistence.save_categories(&next) {
            self.notifier.notify(Notice::error(title, description));
            return Err(err.into());
        }
        self.categories = next;
        Ok(())
    }

    fn not_found(&self, category_id: &str, description: &str) -> StateError {
        self.notifier
            .notify(Notice::error("Category not found", description));
        StateError::NotFound {
            kind: "category",
            id: category_id.to_string(),
        }
    }
}
