//! Partial-update types.
//!
//! [`TaskPatch`] carries only the fields a mutation names; unset fields
//! serialize to nothing at all (not `null`), so the backing store leaves
//! them untouched. [`TaskUpdate`] is the fixed-shape record the reorder
//! engine emits: one (status, order) assignment per affected task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task, TaskId, TaskStatus};

/// Fields for creating a task. The store assigns the id and the caller
/// derives `order` from the creation time so new tasks land at the end
/// of their column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Non-empty title.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Priority.
    pub priority: Priority,
    /// Initial column.
    pub status: TaskStatus,
    /// Initial position within the column.
    pub order: i64,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Creating user id.
    pub created_by: String,
    /// Optional assignee user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A partial update to a task. Every field is optional; `None` means
/// "leave unchanged" and is omitted from the serialized patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// New status (column).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New position within the column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// New due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// New assignee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Replacement tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Replacement comment list (comment appends are read-modify-write
    /// against the full list).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<crate::task::TaskComment>>,
    /// New last-modified timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Returns true if the patch names no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.order.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
            && self.tags.is_none()
            && self.comments.is_none()
            && self.updated_at.is_none()
    }

    /// Applies the patch to a task, replacing only the named fields.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to = Some(assigned_to.clone());
        }
        if let Some(tags) = &self.tags {
            task.tags.clone_from(tags);
        }
        if let Some(comments) = &self.comments {
            task.comments.clone_from(comments);
        }
        if let Some(updated_at) = self.updated_at {
            task.updated_at = updated_at;
        }
    }
}

/// One (status, order) assignment produced by the reorder engine.
///
/// Status is always carried, even for a pure within-column reorder, so
/// the remote record stays trivially consistent with the column it sits
/// in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    /// The task being repositioned.
    pub id: TaskId,
    /// The column the task belongs to after the drop.
    pub status: TaskStatus,
    /// The new position within that column.
    pub order: i64,
}

impl TaskUpdate {
    /// Converts the assignment into a field patch.
    #[must_use]
    pub fn to_patch(&self) -> TaskPatch {
        TaskPatch {
            status: Some(self.status),
            order: Some(self.order),
            ..TaskPatch::default()
        }
    }
}
