//! The in-memory task store.
//!
//! Holds the authoritative-for-the-UI copy of all visible tasks. Local
//! mutations apply synchronously so a drag result is visible with zero
//! perceived latency; the live feed replaces the list wholesale when a
//! reconciled snapshot lands. Column groupings are derived on demand,
//! never stored.

use chrono::{DateTime, Utc};
use taskdeck_model::{Task, TaskId, TaskPatch, TaskStatus, TaskUpdate, column};

/// An opaque copy of the store's contents, used for rollback.
///
/// Restoring a snapshot replaces the store wholesale. Rollback is never
/// a selective un-patch: partial restoration after a failed batch would
/// leave the board in a state neither the user nor the backend ever saw.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot(Vec<Task>);

/// In-memory ordered collection of task records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// All tasks, in feed order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the store holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Takes a rollback snapshot of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot(self.tasks.clone())
    }

    /// Restores a previously taken snapshot wholesale.
    pub fn restore(&mut self, snapshot: TaskSnapshot) {
        self.tasks = snapshot.0;
    }

    /// Replaces the entire task list (reconciled feed snapshot). Later
    /// duplicates of an id are dropped; exactly one copy survives.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let mut deduped: Vec<Task> = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !deduped.iter().any(|t| t.id == task.id) {
                deduped.push(task);
            }
        }
        self.tasks = deduped;
    }

    /// Applies a patch to one task. Returns false when the id is not
    /// present (the patch is discarded).
    pub fn apply_patch(&mut self, id: &TaskId, patch: &TaskPatch) -> bool {
        match self.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                patch.apply(task);
                true
            }
            None => false,
        }
    }

    /// Applies a set of reorder assignments, stamping each touched task
    /// with `updated_at`. Order-independent: each record rewrites only
    /// its own task's (status, order).
    pub fn apply_updates(&mut self, updates: &[TaskUpdate], updated_at: DateTime<Utc>) {
        for update in updates {
            let mut patch = update.to_patch();
            patch.updated_at = Some(updated_at);
            self.apply_patch(&update.id, &patch);
        }
    }

    /// Clears a task's assignee. Returns false when the id is unknown.
    pub fn clear_assignee(&mut self, id: &TaskId, updated_at: DateTime<Utc>) -> bool {
        match self.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                task.assigned_to = None;
                task.updated_at = updated_at;
                true
            }
            None => false,
        }
    }

    /// Appends a comment to a task. Returns false when the id is
    /// unknown.
    pub fn push_comment(&mut self, id: &TaskId, comment: taskdeck_model::TaskComment) -> bool {
        match self.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                task.updated_at = comment.created_at;
                task.comments.push(comment);
                true
            }
            None => false,
        }
    }

    /// One column in display order (priority first). Presentational.
    #[must_use]
    pub fn display_column(&self, status: TaskStatus) -> Vec<&Task> {
        column::display_column(&self.tasks, status)
    }

    /// One column in reorder order (`order` ascending only). The view
    /// drag computations run against.
    #[must_use]
    pub fn reorder_column(&self, status: TaskStatus) -> Vec<&Task> {
        column::reorder_column(&self.tasks, status)
    }
}
