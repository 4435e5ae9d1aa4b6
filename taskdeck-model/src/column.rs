//! Column views over a flat task list.
//!
//! Columns are derived, never persisted: each board column is the set of
//! tasks sharing one status value. Two sorts exist on purpose. The
//! display sort puts high-priority cards first and is purely
//! presentational. The reorder sort uses `order` alone and is the ONLY
//! ordering the reorder engine may consult, otherwise a drag computed
//! against the pretty ordering would persist positions the user never
//! chose.

use chrono::{DateTime, Duration, Utc};

use crate::task::{Priority, Task, TaskStatus};

/// The four board columns, in display order.
pub const BOARD_COLUMNS: [TaskStatus; 4] = [
    TaskStatus::Todo,
    TaskStatus::InProgress,
    TaskStatus::Review,
    TaskStatus::Done,
];

/// Deterministic tail ordering for equal `order` values: newest first,
/// then id. Keeps renders stable when order values collide.
fn tie_break(a: &Task, b: &Task) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Tasks of one column in display order: priority descending, then
/// `order` ascending, then the deterministic tie break.
#[must_use]
pub fn display_column(tasks: &[Task], status: TaskStatus) -> Vec<&Task> {
    let mut column: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
    column.sort_by(|a, b| {
        b.priority
            .weight()
            .cmp(&a.priority.weight())
            .then_with(|| a.order.cmp(&b.order))
            .then_with(|| tie_break(a, b))
    });
    column
}

/// Tasks of one column in reorder order: `order` ascending only (plus
/// the tie break). Drag computations operate on this view.
#[must_use]
pub fn reorder_column(tasks: &[Task], status: TaskStatus) -> Vec<&Task> {
    let mut column: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
    column.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| tie_break(a, b)));
    column
}

/// Presentational due-date filter buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueFilter {
    /// No due-date filtering.
    #[default]
    All,
    /// Due date strictly in the past.
    Overdue,
    /// Due within the next 24 hours.
    DueSoon,
    /// No due date set.
    NoDueDate,
}

impl DueFilter {
    /// Whether a task passes this filter at the given instant.
    #[must_use]
    pub fn matches(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Overdue => task.due_date.is_some_and(|due| due < now),
            Self::DueSoon => task
                .due_date
                .is_some_and(|due| due >= now && due <= now + Duration::hours(24)),
            Self::NoDueDate => task.due_date.is_none(),
        }
    }
}

/// Applies the presentational filters to a task list. Filtering never
/// feeds back into reorder computations or persisted order.
#[must_use]
pub fn filter_tasks(
    tasks: &[Task],
    priority: Option<Priority>,
    due: DueFilter,
    now: DateTime<Utc>,
) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| priority.is_none_or(|p| t.priority == p))
        .filter(|t| due.matches(t, now))
        .collect()
}
