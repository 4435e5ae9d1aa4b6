//! The persistence dispatcher.
//!
//! Converts a reorder plan into writes against the document store: a
//! single-record update when exactly one task changed (a column-body
//! drop), one atomic batch otherwise (a full-column renumber). The
//! batch's all-or-nothing behavior is the store's guarantee; on failure
//! every remote record is unchanged and the caller rolls the local
//! store back. Failures are never retried here.

use chrono::{DateTime, Utc};
use taskdeck_backend::{DocumentStore, StoreError};
use taskdeck_model::TaskUpdate;

use crate::service;

/// Persists a reorder plan.
///
/// # Errors
///
/// Returns [`StoreError`] when the store rejects the write. The caller
/// owns rollback and user notification.
pub async fn persist_updates<S: DocumentStore>(
    store: &S,
    updates: &[TaskUpdate],
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    match updates {
        [] => Ok(()),
        [single] => {
            tracing::debug!(id = %single.id, order = single.order, status = %single.status, "dispatching single update");
            service::update_task(store, &single.id, &single.to_patch(), now).await
        }
        many => {
            tracing::debug!(count = many.len(), "dispatching batch update");
            let batch = many
                .iter()
                .map(|update| {
                    (
                        update.id.as_str().to_string(),
                        service::patch_fields(&update.to_patch(), now),
                    )
                })
                .collect();
            store.batch_update(service::TASKS_COLLECTION, batch).await
        }
    }
}
