//! Taskdeck entity model.
//!
//! Defines the task record stored in the document database, the partial
//! update types used for optimistic edits, and the pure column-view rules
//! (grouping, display sort, reorder sort, presentational filters).

pub mod column;
pub mod patch;
pub mod task;
pub mod user;

pub use column::{BOARD_COLUMNS, DueFilter, display_column, filter_tasks, reorder_column};
pub use patch::{NewTask, TaskPatch, TaskUpdate};
pub use task::{Priority, Task, TaskComment, TaskId, TaskStatus};
pub use user::UserRole;
