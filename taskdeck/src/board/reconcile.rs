//! Live-feed reconciliation.
//!
//! Authoritative snapshots arrive from two independent feeds (tasks the
//! user created, tasks assigned to the user). They are deduplicated by
//! id, then either applied to the task store immediately or, when a
//! local optimistic edit is fresh enough that an immediate replace would
//! visibly revert an in-flight drag, deferred and reapplied after the
//! guard window passes. Deferred snapshots are never dropped; the board
//! always converges on what the store last pushed.

use std::time::Duration;

use taskdeck_model::{Task, TaskId};
use tokio::time::Instant;

/// Which feed a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// Tasks the signed-in user created.
    CreatedByMe,
    /// Tasks assigned to the signed-in user.
    AssignedToMe,
}

/// Latest snapshot from each feed. Either feed may not have reported
/// yet; `merged` combines whatever is present.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    created: Option<Vec<Task>>,
    assigned: Option<Vec<Task>>,
}

impl FeedState {
    /// Records a feed's latest snapshot, replacing its previous one.
    pub fn update(&mut self, source: FeedSource, tasks: Vec<Task>) {
        match source {
            FeedSource::CreatedByMe => self.created = Some(tasks),
            FeedSource::AssignedToMe => self.assigned = Some(tasks),
        }
    }

    /// Whether any feed has delivered a snapshot yet.
    #[must_use]
    pub const fn has_reported(&self) -> bool {
        self.created.is_some() || self.assigned.is_some()
    }

    /// Both feeds combined, deduplicated by task id.
    #[must_use]
    pub fn merged(&self) -> Vec<Task> {
        merge_feeds(
            self.created.as_deref().unwrap_or_default(),
            self.assigned.as_deref().unwrap_or_default(),
        )
    }
}

/// Combines two feed snapshots, keeping exactly one copy per task id.
/// When an id appears in both, the first feed's copy survives.
#[must_use]
pub fn merge_feeds(created: &[Task], assigned: &[Task]) -> Vec<Task> {
    let mut merged: Vec<Task> = Vec::with_capacity(created.len() + assigned.len());
    let mut seen: Vec<&TaskId> = Vec::with_capacity(merged.capacity());
    for task in created.iter().chain(assigned) {
        if !seen.contains(&&task.id) {
            seen.push(&task.id);
            merged.push(task.clone());
        }
    }
    merged
}

/// What to do with an incoming snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDisposition {
    /// No fresh local edit: replace the store now.
    ApplyNow,
    /// A local edit is inside the guard window: hold the snapshot and
    /// reapply it after the deferral delay.
    Defer,
}

/// Guard-window check for an incoming snapshot.
#[must_use]
pub fn classify(
    now: Instant,
    last_local_edit: Option<Instant>,
    guard_window: Duration,
) -> SnapshotDisposition {
    match last_local_edit {
        Some(edited_at) if now.saturating_duration_since(edited_at) <= guard_window => {
            SnapshotDisposition::Defer
        }
        _ => SnapshotDisposition::ApplyNow,
    }
}

/// A snapshot held back by the guard window, due for unconditional
/// reapplication. A newer deferral replaces a pending one; the applied
/// contents are whatever was deferred last.
#[derive(Debug, Clone)]
pub struct DeferredSnapshot {
    /// The merged task list to reapply.
    pub tasks: Vec<Task>,
    /// When to reapply it.
    pub due: Instant,
}
