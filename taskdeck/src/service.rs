//! Task service: typed access to the `tasks` collection.
//!
//! Converts between [`Task`] values and the store's JSON documents, and
//! wraps the [`DocumentStore`] capability with the task-shaped calls the
//! board uses: creation, single-field updates, the two user feeds, and
//! one-shot queries.
//!
//! The store keeps a record's id outside its field object; a typed task
//! is the field object with the id spliced back in.

use chrono::{DateTime, Utc};
use serde_json::Value;
use taskdeck_backend::{Document, DocumentStore, Filter, Sort, StoreError, Subscription};
use taskdeck_model::{NewTask, Task, TaskId, TaskPatch};

/// Collection holding task documents.
pub const TASKS_COLLECTION: &str = "tasks";

/// Rebuilds a typed task from a stored document.
///
/// Returns `None` (and logs) when the document does not decode; a
/// malformed record written by some other client must not take the whole
/// feed down.
#[must_use]
pub fn task_from_document(doc: &Document) -> Option<Task> {
    let mut fields = doc.fields.clone();
    if let Some(obj) = fields.as_object_mut() {
        obj.insert("id".to_string(), Value::String(doc.id.clone()));
    }
    match serde_json::from_value(fields) {
        Ok(task) => Some(task),
        Err(error) => {
            tracing::warn!(id = %doc.id, %error, "skipping malformed task document");
            None
        }
    }
}

/// Rebuilds typed tasks from a snapshot, skipping malformed documents.
#[must_use]
pub fn tasks_from_documents(docs: &[Document]) -> Vec<Task> {
    docs.iter().filter_map(task_from_document).collect()
}

/// Serializes creation fields, stamping `createdAt`/`updatedAt`.
#[must_use]
pub fn new_task_fields(new_task: &NewTask, now: DateTime<Utc>) -> Value {
    let mut fields = serde_json::to_value(new_task).unwrap_or(Value::Null);
    if let Some(obj) = fields.as_object_mut() {
        obj.insert("createdAt".to_string(), timestamp(now));
        obj.insert("updatedAt".to_string(), timestamp(now));
        obj.insert("comments".to_string(), Value::Array(Vec::new()));
    }
    fields
}

/// Serializes a patch, stamping `updatedAt`. Unset fields stay absent
/// so the store leaves them untouched.
#[must_use]
pub fn patch_fields(patch: &TaskPatch, now: DateTime<Utc>) -> Value {
    let mut fields = serde_json::to_value(patch).unwrap_or(Value::Null);
    if let Some(obj) = fields.as_object_mut() {
        obj.insert("updatedAt".to_string(), timestamp(now));
    }
    fields
}

fn timestamp(at: DateTime<Utc>) -> Value {
    serde_json::to_value(at).unwrap_or(Value::Null)
}

/// Creates a task record and returns its store-assigned id.
///
/// # Errors
///
/// Returns [`StoreError`] when the store rejects the write.
pub async fn create_task<S: DocumentStore>(
    store: &S,
    new_task: &NewTask,
    now: DateTime<Utc>,
) -> Result<TaskId, StoreError> {
    let id = store
        .create(TASKS_COLLECTION, new_task_fields(new_task, now))
        .await?;
    tracing::info!(%id, title = %new_task.title, "task created");
    Ok(TaskId::from_raw(id))
}

/// Applies a field patch to one task record.
///
/// # Errors
///
/// Returns [`StoreError`] when the store rejects the write.
pub async fn update_task<S: DocumentStore>(
    store: &S,
    id: &TaskId,
    patch: &TaskPatch,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    store
        .update(TASKS_COLLECTION, id.as_str(), patch_fields(patch, now))
        .await
}

/// Clears a task's assignee by writing an explicit `null`.
///
/// # Errors
///
/// Returns [`StoreError`] when the store rejects the write.
pub async fn unassign_task<S: DocumentStore>(
    store: &S,
    id: &TaskId,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let patch = serde_json::json!({
        "assignedTo": Value::Null,
        "updatedAt": timestamp(now),
    });
    store.update(TASKS_COLLECTION, id.as_str(), patch).await
}

/// The feed sort used by user queries: `order` ascending, then newest
/// first.
#[must_use]
pub fn feed_sort() -> Sort {
    Sort::asc("order").then_desc("createdAt")
}

/// One-shot query: tasks created by a user.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails.
pub async fn user_created_tasks<S: DocumentStore>(
    store: &S,
    user_id: &str,
) -> Result<Vec<Task>, StoreError> {
    let docs = store
        .query(
            TASKS_COLLECTION,
            &Filter::field_eq("createdBy", user_id),
            &feed_sort(),
        )
        .await?;
    Ok(tasks_from_documents(&docs))
}

/// One-shot query: tasks assigned to a user.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails.
pub async fn user_assigned_tasks<S: DocumentStore>(
    store: &S,
    user_id: &str,
) -> Result<Vec<Task>, StoreError> {
    let docs = store
        .query(
            TASKS_COLLECTION,
            &Filter::field_eq("assignedTo", user_id),
            &feed_sort(),
        )
        .await?;
    Ok(tasks_from_documents(&docs))
}

/// One-shot query: everything a user sees (created by or assigned to
/// them), deduplicated by id with the same rule as the live feeds and
/// sorted by (order, newest first).
///
/// # Errors
///
/// Returns [`StoreError`] when either query fails.
pub async fn user_tasks<S: DocumentStore>(
    store: &S,
    user_id: &str,
) -> Result<Vec<Task>, StoreError> {
    let created = user_created_tasks(store, user_id).await?;
    let assigned = user_assigned_tasks(store, user_id).await?;
    let mut merged = crate::board::reconcile::merge_feeds(&created, &assigned);
    merged.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    Ok(merged)
}

/// Live feed of tasks created by a user.
pub fn subscribe_created<S: DocumentStore>(store: &S, user_id: &str) -> Subscription {
    store.subscribe(TASKS_COLLECTION, Filter::field_eq("createdBy", user_id))
}

/// Live feed of tasks assigned to a user.
pub fn subscribe_assigned<S: DocumentStore>(store: &S, user_id: &str) -> Subscription {
    store.subscribe(TASKS_COLLECTION, Filter::field_eq("assignedTo", user_id))
}
