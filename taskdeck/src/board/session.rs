//! The board session actor.
//!
//! One `BoardSession` owns every piece of mutable board state: the task
//! store, the guard timestamp, the pending deferred snapshot, and the
//! active notice. All mutation funnels through its event loop, so
//! commands, feed snapshots, and timer expirations interleave without
//! ever running concurrently.
//!
//! The ordering contract: a local optimistic mutation is always applied
//! (and made visible through [`BoardEvent::TasksChanged`]) before the
//! corresponding store write is issued. The UI never sees pre-drag state
//! while a write is in flight; on failure it sees the rolled-back store
//! plus a transient error notice, never an error value.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use taskdeck_backend::{DocumentStore, Subscription};
use taskdeck_model::{NewTask, Priority, Task, TaskComment, TaskId, TaskPatch, TaskStatus, TaskUpdate};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::BoardConfig;
use crate::service;

use super::dispatch;
use super::reconcile::{
    DeferredSnapshot, FeedSource, FeedState, SnapshotDisposition, classify,
};
use super::reorder::{DragEnd, plan_drop};
use super::store::TaskStore;
use super::{BoardEvent, Notice};

/// Fields for creating a task through the session. The session supplies
/// the creator id and the creation-time-derived order value.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    /// Non-empty title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Priority.
    pub priority: Priority,
    /// Initial column.
    pub status: TaskStatus,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Optional assignee.
    pub assigned_to: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl TaskDraft {
    /// A draft with just a title, landing in the To Do column.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            status: TaskStatus::Todo,
            due_date: None,
            assigned_to: None,
            tags: Vec::new(),
        }
    }
}

/// Commands accepted by the session's event loop.
#[derive(Debug)]
pub enum BoardCommand {
    /// A completed drag gesture. Replies with the applied update set.
    DragEnd {
        /// The gesture.
        drag: DragEnd,
        /// Reply channel for the applied updates.
        reply: oneshot::Sender<Vec<TaskUpdate>>,
    },
    /// Create a task. Replies with the new id on success.
    CreateTask {
        /// Creation fields.
        draft: TaskDraft,
        /// Reply channel for the assigned id.
        reply: oneshot::Sender<Option<TaskId>>,
    },
    /// Apply a field edit to a task.
    UpdateTask {
        /// Target task.
        id: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Assign a task to a user.
    Assign {
        /// Target task.
        id: TaskId,
        /// Assignee user id.
        user_id: String,
    },
    /// Clear a task's assignee.
    Unassign {
        /// Target task.
        id: TaskId,
    },
    /// Append a comment to a task.
    AddComment {
        /// Target task.
        id: TaskId,
        /// Comment body.
        content: String,
    },
    /// Stop the event loop.
    Shutdown,
}

/// Single-owner board state, driven by [`run`](Self::run) or directly
/// by tests.
pub struct BoardSession<S: DocumentStore> {
    user_id: String,
    config: BoardConfig,
    backend: Arc<S>,
    store: TaskStore,
    events: mpsc::Sender<BoardEvent>,
    last_local_edit: Option<Instant>,
    feeds: FeedState,
    deferred: Option<DeferredSnapshot>,
    notice_due: Option<Instant>,
}

impl<S: DocumentStore> BoardSession<S> {
    /// Creates a session and the event receiver the UI layer consumes.
    #[must_use]
    pub fn new(
        backend: Arc<S>,
        user_id: impl Into<String>,
        config: BoardConfig,
    ) -> (Self, mpsc::Receiver<BoardEvent>) {
        let (events, events_rx) = mpsc::channel(config.channel_capacity);
        (
            Self {
                user_id: user_id.into(),
                config,
                backend,
                store: TaskStore::new(),
                events,
                last_local_edit: None,
                feeds: FeedState::default(),
                deferred: None,
                notice_due: None,
            },
            events_rx,
        )
    }

    /// Read access to the task store, for tests and diagnostics.
    #[must_use]
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Deadline of the pending deferred snapshot, if any.
    #[must_use]
    pub fn deferred_due(&self) -> Option<Instant> {
        self.deferred.as_ref().map(|d| d.due)
    }

    /// Deadline of the active notice, if any.
    #[must_use]
    pub const fn notice_due(&self) -> Option<Instant> {
        self.notice_due
    }

    async fn emit(&self, event: BoardEvent) {
        // A departed UI is not an error; the session keeps its own state
        // consistent regardless.
        let _ = self.events.send(event).await;
    }

    async fn emit_tasks_changed(&self) {
        self.emit(BoardEvent::TasksChanged(self.store.tasks().to_vec()))
            .await;
    }

    async fn show_notice(&mut self, notice: Notice) {
        self.notice_due = Some(Instant::now() + self.config.notice_timeout);
        self.emit(BoardEvent::Notice(notice)).await;
    }

    /// Dismisses the active notice.
    pub async fn clear_notice(&mut self) {
        self.notice_due = None;
        self.emit(BoardEvent::NoticeCleared).await;
    }

    fn mark_local_edit(&mut self) {
        self.last_local_edit = Some(Instant::now());
    }

    // -- drag-and-drop -----------------------------------------------------

    /// Handles a completed drag gesture: plan, optimistic apply,
    /// persist, and on failure roll back. Returns the applied updates
    /// (empty for no-ops, validation failures, and rolled-back writes).
    pub async fn handle_drag(&mut self, drag: DragEnd) -> Vec<TaskUpdate> {
        let plan = match plan_drop(self.store.tasks(), &drag, self.config.order_step) {
            Ok(plan) => plan,
            Err(error) => {
                tracing::warn!(%error, "ignoring drag with unknown task reference");
                return Vec::new();
            }
        };
        if plan.is_empty() {
            tracing::debug!(active = %drag.active_task, "drop landed on its current position");
            return Vec::new();
        }

        let single = plan.len() == 1;
        let snapshot = self.store.snapshot();
        let now = Utc::now();

        // Optimistic apply before the write is issued, and success
        // feedback immediately; a failure notice replaces it only if
        // the write later fails.
        self.mark_local_edit();
        self.store.apply_updates(&plan, now);
        self.emit_tasks_changed().await;
        self.show_notice(Notice::success(if single {
            "Task status updated!"
        } else {
            "Task order updated!"
        }))
        .await;

        match dispatch::persist_updates(self.backend.as_ref(), &plan, now).await {
            Ok(()) => {
                for update in &plan {
                    self.emit(BoardEvent::TaskPersisted {
                        id: update.id.clone(),
                        patch: update.to_patch(),
                    })
                    .await;
                }
                plan
            }
            Err(error) => {
                tracing::error!(%error, "persist failed, rolling back to pre-drag snapshot");
                self.store.restore(snapshot);
                self.emit_tasks_changed().await;
                self.show_notice(Notice::error(if single {
                    "Failed to update task status!"
                } else {
                    "Failed to update task order!"
                }))
                .await;
                Vec::new()
            }
        }
    }

    // -- direct edits ------------------------------------------------------

    /// Creates a task. The live feed delivers the new record; nothing is
    /// inserted locally (a local insert plus the feed copy would
    /// duplicate it).
    pub async fn handle_create(&mut self, draft: TaskDraft) -> Option<TaskId> {
        if draft.title.is_empty() {
            tracing::warn!("ignoring task creation with empty title");
            return None;
        }
        let now = Utc::now();
        let new_task = NewTask {
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: draft.status,
            order: now.timestamp_millis(),
            due_date: draft.due_date,
            created_by: self.user_id.clone(),
            assigned_to: draft.assigned_to,
            tags: draft.tags,
        };
        match service::create_task(self.backend.as_ref(), &new_task, now).await {
            Ok(id) => Some(id),
            Err(error) => {
                tracing::error!(%error, "task creation failed");
                self.show_notice(Notice::error("Failed to create task!")).await;
                None
            }
        }
    }

    /// Applies a field edit optimistically, then persists it. Rolls
    /// back on failure.
    pub async fn handle_update_task(&mut self, id: &TaskId, patch: TaskPatch) {
        if self.store.get(id).is_none() {
            tracing::warn!(%id, "ignoring update for unknown task");
            return;
        }
        let snapshot = self.store.snapshot();
        let now = Utc::now();

        self.mark_local_edit();
        let mut stamped = patch.clone();
        stamped.updated_at = Some(now);
        self.store.apply_patch(id, &stamped);
        self.emit_tasks_changed().await;

        match service::update_task(self.backend.as_ref(), id, &patch, now).await {
            Ok(()) => {
                self.emit(BoardEvent::TaskPersisted {
                    id: id.clone(),
                    patch: stamped,
                })
                .await;
            }
            Err(error) => {
                tracing::error!(%id, %error, "task update failed, rolling back");
                self.store.restore(snapshot);
                self.emit_tasks_changed().await;
                self.show_notice(Notice::error("Failed to update task!")).await;
            }
        }
    }

    /// Assigns a task to a user.
    pub async fn handle_assign(&mut self, id: &TaskId, user_id: String) {
        let patch = TaskPatch {
            assigned_to: Some(user_id),
            ..TaskPatch::default()
        };
        self.handle_update_task(id, patch).await;
    }

    /// Clears a task's assignee (an explicit `null` write; absent patch
    /// fields would leave the assignee in place).
    pub async fn handle_unassign(&mut self, id: &TaskId) {
        if self.store.get(id).is_none() {
            tracing::warn!(%id, "ignoring unassign for unknown task");
            return;
        }
        let snapshot = self.store.snapshot();
        let now = Utc::now();

        self.mark_local_edit();
        self.store.clear_assignee(id, now);
        self.emit_tasks_changed().await;

        if let Err(error) = service::unassign_task(self.backend.as_ref(), id, now).await {
            tracing::error!(%id, %error, "unassign failed, rolling back");
            self.store.restore(snapshot);
            self.emit_tasks_changed().await;
            self.show_notice(Notice::error("Failed to update task!")).await;
        }
    }

    /// Appends a comment to a task (read-modify-write over the comment
    /// list, using the session's local copy as the read).
    pub async fn handle_add_comment(&mut self, id: &TaskId, content: String) {
        let Some(task) = self.store.get(id) else {
            tracing::warn!(%id, "ignoring comment for unknown task");
            return;
        };
        let now = Utc::now();
        let comment = TaskComment {
            id: format!("comment-{}", Uuid::now_v7()),
            content,
            author_id: self.user_id.clone(),
            created_at: now,
            updated_at: None,
        };
        let mut comments = task.comments.clone();
        comments.push(comment.clone());

        let snapshot = self.store.snapshot();
        self.mark_local_edit();
        self.store.push_comment(id, comment);
        self.emit_tasks_changed().await;

        let patch = TaskPatch {
            comments: Some(comments),
            ..TaskPatch::default()
        };
        if let Err(error) = service::update_task(self.backend.as_ref(), id, &patch, now).await {
            tracing::error!(%id, %error, "comment write failed, rolling back");
            self.store.restore(snapshot);
            self.emit_tasks_changed().await;
            self.show_notice(Notice::error("Failed to add comment!")).await;
        }
    }

    // -- reconciliation ----------------------------------------------------

    /// Handles an incoming feed snapshot: merge the two feeds, then
    /// apply now or defer past the guard window.
    pub async fn handle_snapshot(&mut self, source: FeedSource, tasks: Vec<Task>) {
        tracing::debug!(?source, count = tasks.len(), "feed snapshot received");
        self.feeds.update(source, tasks);
        let merged = self.feeds.merged();

        match classify(Instant::now(), self.last_local_edit, self.config.guard_window) {
            SnapshotDisposition::ApplyNow => {
                self.store.replace_all(merged);
                self.emit_tasks_changed().await;
            }
            SnapshotDisposition::Defer => {
                tracing::debug!("local edit inside guard window, deferring snapshot");
                self.deferred = Some(DeferredSnapshot {
                    tasks: merged,
                    due: Instant::now() + self.config.defer_delay,
                });
            }
        }
    }

    /// Applies the pending deferred snapshot, if any. Reconciliation is
    /// not a local edit: the guard timestamp stays untouched.
    pub async fn apply_deferred(&mut self) {
        if let Some(deferred) = self.deferred.take() {
            tracing::debug!(count = deferred.tasks.len(), "applying deferred snapshot");
            self.store.replace_all(deferred.tasks);
            self.emit_tasks_changed().await;
        }
    }

    // -- event loop --------------------------------------------------------

    /// Executes one command. Returns false when the loop should stop.
    pub async fn handle_command(&mut self, command: BoardCommand) -> bool {
        match command {
            BoardCommand::DragEnd { drag, reply } => {
                let applied = self.handle_drag(drag).await;
                let _ = reply.send(applied);
            }
            BoardCommand::CreateTask { draft, reply } => {
                let id = self.handle_create(draft).await;
                let _ = reply.send(id);
            }
            BoardCommand::UpdateTask { id, patch } => {
                self.handle_update_task(&id, patch).await;
            }
            BoardCommand::Assign { id, user_id } => {
                self.handle_assign(&id, user_id).await;
            }
            BoardCommand::Unassign { id } => {
                self.handle_unassign(&id).await;
            }
            BoardCommand::AddComment { id, content } => {
                self.handle_add_comment(&id, content).await;
            }
            BoardCommand::Shutdown => return false,
        }
        true
    }

    /// Drives the session until shutdown: commands, the two feed
    /// subscriptions, the deferred-snapshot timer, and the notice
    /// auto-dismiss timer, all serialized through one loop.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<BoardCommand>,
        mut created: Subscription,
        mut assigned: Subscription,
    ) {
        let mut created_open = true;
        let mut assigned_open = true;

        loop {
            let deferred_due = self.deferred_due();
            let notice_due = self.notice_due();

            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                snapshot = created.recv(), if created_open => {
                    match snapshot {
                        Some(docs) => {
                            self.handle_snapshot(
                                FeedSource::CreatedByMe,
                                service::tasks_from_documents(&docs),
                            )
                            .await;
                        }
                        None => {
                            tracing::warn!("created-by feed closed");
                            created_open = false;
                        }
                    }
                }
                snapshot = assigned.recv(), if assigned_open => {
                    match snapshot {
                        Some(docs) => {
                            self.handle_snapshot(
                                FeedSource::AssignedToMe,
                                service::tasks_from_documents(&docs),
                            )
                            .await;
                        }
                        None => {
                            tracing::warn!("assigned-to feed closed");
                            assigned_open = false;
                        }
                    }
                }
                () = tokio::time::sleep_until(deferred_due.unwrap_or_else(Instant::now)),
                    if deferred_due.is_some() =>
                {
                    self.apply_deferred().await;
                }
                () = tokio::time::sleep_until(notice_due.unwrap_or_else(Instant::now)),
                    if notice_due.is_some() =>
                {
                    self.clear_notice().await;
                }
            }
        }

        created.unsubscribe();
        assigned.unsubscribe();
        tracing::debug!("board session stopped");
    }
}

/// Cloneable handle for driving a spawned board session.
#[derive(Debug, Clone)]
pub struct BoardHandle {
    commands: mpsc::Sender<BoardCommand>,
}

impl BoardHandle {
    /// Completes a drag gesture and returns the applied update set.
    /// Empty when the drop was a no-op, referenced an unknown task, or
    /// was rolled back after a persistence failure.
    pub async fn drag_end(&self, drag: DragEnd) -> Vec<TaskUpdate> {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(BoardCommand::DragEnd { drag, reply })
            .await
            .is_err()
        {
            return Vec::new();
        }
        response.await.unwrap_or_default()
    }

    /// Creates a task; the live feed delivers it to the board.
    pub async fn create_task(&self, draft: TaskDraft) -> Option<TaskId> {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(BoardCommand::CreateTask { draft, reply })
            .await
            .is_err()
        {
            return None;
        }
        response.await.unwrap_or_default()
    }

    /// Applies a field edit to a task.
    pub async fn update_task(&self, id: TaskId, patch: TaskPatch) {
        let _ = self
            .commands
            .send(BoardCommand::UpdateTask { id, patch })
            .await;
    }

    /// Assigns a task to a user.
    pub async fn assign(&self, id: TaskId, user_id: impl Into<String>) {
        let _ = self
            .commands
            .send(BoardCommand::Assign {
                id,
                user_id: user_id.into(),
            })
            .await;
    }

    /// Clears a task's assignee.
    pub async fn unassign(&self, id: TaskId) {
        let _ = self.commands.send(BoardCommand::Unassign { id }).await;
    }

    /// Appends a comment to a task.
    pub async fn add_comment(&self, id: TaskId, content: impl Into<String>) {
        let _ = self
            .commands
            .send(BoardCommand::AddComment {
                id,
                content: content.into(),
            })
            .await;
    }

    /// Stops the session's event loop.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(BoardCommand::Shutdown).await;
    }
}

/// Spawns a board session for a user: registers the two live feeds,
/// starts the event loop, and returns the command handle plus the event
/// receiver.
pub fn spawn_board<S: DocumentStore + 'static>(
    backend: Arc<S>,
    user_id: impl Into<String>,
    config: BoardConfig,
) -> (BoardHandle, mpsc::Receiver<BoardEvent>) {
    let user_id = user_id.into();
    let (commands, command_rx) = mpsc::channel(config.channel_capacity);
    let created = service::subscribe_created(backend.as_ref(), &user_id);
    let assigned = service::subscribe_assigned(backend.as_ref(), &user_id);
    let (session, events) = BoardSession::new(backend, user_id, config);
    tokio::spawn(session.run(command_rx, created, assigned));
    (BoardHandle { commands }, events)
}
