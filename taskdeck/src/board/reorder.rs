//! The reorder engine.
//!
//! Turns a drag-end gesture into the full set of (status, order)
//! assignments that realize the move. Pure: same snapshot and gesture in,
//! same plan out, no clocks and no I/O.
//!
//! Two drop shapes exist:
//! - dropped on a column body: the card goes to the end of that column,
//!   one assignment;
//! - dropped on a card: index-based insertion before that card, after
//!   which EVERY task in the affected column is renumbered `index * step`.
//!   Renumbering the whole column on each drop keeps order values from
//!   colliding or drifting over repeated reorders, at the cost of a wider
//!   write set. The wider set is deliberate and the persistence layer
//!   batches it atomically.

use taskdeck_model::{Task, TaskId, TaskStatus, TaskUpdate};
use thiserror::Error;

/// A completed drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    /// The card that was dragged.
    pub active_task: TaskId,
    /// The column it was released over.
    pub target_column: TaskStatus,
    /// The card it was released onto, when it landed on a card rather
    /// than on the column body.
    pub target_task: Option<TaskId>,
}

impl DragEnd {
    /// Drop onto a column body.
    #[must_use]
    pub const fn onto_column(active_task: TaskId, target_column: TaskStatus) -> Self {
        Self {
            active_task,
            target_column,
            target_task: None,
        }
    }

    /// Drop onto a specific card.
    #[must_use]
    pub const fn onto_task(
        active_task: TaskId,
        target_column: TaskStatus,
        target_task: TaskId,
    ) -> Self {
        Self {
            active_task,
            target_column,
            target_task: Some(target_task),
        }
    }
}

/// Validation failures for a drag gesture. The session treats these as
/// no-ops: logged, nothing persisted, no user-visible error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    /// The dragged card is not in the current snapshot.
    #[error("dragged task not found: {0}")]
    UnknownActiveTask(TaskId),
    /// The drop target card is not in the current snapshot.
    #[error("drop target not found: {0}")]
    UnknownTargetTask(TaskId),
}

/// Moves `list[from]` to position `to`, shifting everything between.
fn array_move<T>(list: &mut Vec<T>, from: usize, to: usize) {
    let item = list.remove(from);
    list.insert(to, item);
}

/// Computes the update set for a drag gesture against a task snapshot.
///
/// An empty plan means the drop changed nothing (same position, or a
/// target that is not part of the target column's working list) and no
/// persistence call should be made.
///
/// # Errors
///
/// Returns [`ReorderError`] when the gesture references a task id that
/// is not in the snapshot.
pub fn plan_drop(
    tasks: &[Task],
    drag: &DragEnd,
    step: i64,
) -> Result<Vec<TaskUpdate>, ReorderError> {
    let active = tasks
        .iter()
        .find(|t| t.id == drag.active_task)
        .ok_or_else(|| ReorderError::UnknownActiveTask(drag.active_task.clone()))?;

    // The working list is the target column by order ascending only.
    // The priority-weighted display sort must never leak in here.
    let column = taskdeck_model::reorder_column(tasks, drag.target_column);

    let Some(target_id) = &drag.target_task else {
        // Dropped on the column body: append to the end.
        let new_order = column
            .last()
            .map_or(step, |last| last.order.saturating_add(step));
        return Ok(vec![TaskUpdate {
            id: active.id.clone(),
            status: drag.target_column,
            order: new_order,
        }]);
    };

    if !tasks.iter().any(|t| &t.id == target_id) {
        return Err(ReorderError::UnknownTargetTask(target_id.clone()));
    }

    // Cross-column drop: the active card is not in the target column's
    // working list yet, so insert it just before the target card (its
    // status is provisionally the target column from here on).
    let mut working: Vec<&TaskId> = column.iter().map(|t| &t.id).collect();
    if !working.contains(&&active.id) {
        match working.iter().position(|id| *id == target_id) {
            Some(index) => working.insert(index, &active.id),
            None => working.push(&active.id),
        }
    }

    let Some(target_index) = working.iter().position(|id| *id == target_id) else {
        // Target exists but sits outside this column's working list.
        // Nothing meaningful to reorder against.
        return Ok(Vec::new());
    };
    let Some(active_index) = working.iter().position(|id| *id == &active.id) else {
        return Ok(Vec::new());
    };

    if active_index == target_index {
        // Dropped at its own position.
        return Ok(Vec::new());
    }

    array_move(&mut working, active_index, target_index);

    // Renumber the entire column, one record per task, status always
    // included.
    Ok(working
        .into_iter()
        .enumerate()
        .map(|(index, id)| TaskUpdate {
            id: id.clone(),
            status: drag.target_column,
            order: i64::try_from(index).unwrap_or(i64::MAX).saturating_mul(step),
        })
        .collect())
}
