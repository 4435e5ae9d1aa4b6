//! Board core: optimistic drag-and-drop with live-feed reconciliation.
//!
//! The [`session::BoardSession`] actor owns all mutable board state and
//! serializes every mutation through one event loop. The pieces it
//! composes are pure and separately testable: the reorder planner
//! ([`reorder`]), the in-memory task store ([`store`]), the guard-window
//! reconciler ([`reconcile`]), and the persistence dispatcher
//! ([`dispatch`]).

pub mod dispatch;
pub mod reconcile;
pub mod reorder;
pub mod session;
pub mod store;

pub use reorder::{DragEnd, ReorderError, plan_drop};
pub use session::{BoardHandle, BoardSession, spawn_board};
pub use store::TaskStore;

use taskdeck_model::{Task, TaskId, TaskPatch};

/// Transient user-facing notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Optimistic success feedback.
    Success,
    /// A persistence failure the user should re-attempt.
    Error,
}

/// A transient notification. Auto-dismissed by the session after its
/// configured timeout (a [`BoardEvent::NoticeCleared`] follows).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub kind: NoticeKind,
    /// Display text.
    pub text: String,
}

impl Notice {
    /// Success notice.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    /// Error notice.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Events emitted by the board session for surrounding UI components.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// The visible task list changed (optimistic apply, rollback, or
    /// reconciled snapshot). Carries the full current list.
    TasksChanged(Vec<Task>),
    /// A transient notification to display.
    Notice(Notice),
    /// The current notification's display window elapsed.
    NoticeCleared,
    /// A field patch was confirmed by the backing store. Fired once per
    /// applied update so other views can refresh their own copies.
    TaskPersisted {
        /// The persisted task.
        id: TaskId,
        /// The fields that were written.
        patch: TaskPatch,
    },
}
