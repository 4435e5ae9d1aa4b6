//! Integration tests for live-feed reconciliation.
//!
//! Covers the guard window (snapshots arriving right after a local drag
//! are deferred, then applied), convergence with edits from other
//! sessions, and cross-feed deduplication.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use taskdeck::board::{BoardEvent, DragEnd, spawn_board};
use taskdeck::config::BoardConfig;
use taskdeck::service;
use taskdeck_backend::DocumentStore;
use taskdeck_backend::memory::MemoryStore;
use taskdeck_model::{NewTask, Priority, Task, TaskStatus};
use tokio::sync::mpsc;

const USER: &str = "user-a";
const OTHER: &str = "user-b";

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

async fn seed_one(
    backend: &MemoryStore,
    title: &str,
    created_by: &str,
    assigned_to: Option<&str>,
    order: i64,
) -> taskdeck_model::TaskId {
    let new_task = NewTask {
        title: title.to_string(),
        description: None,
        priority: Priority::Medium,
        status: TaskStatus::Todo,
        order,
        due_date: None,
        created_by: created_by.to_string(),
        assigned_to: assigned_to.map(str::to_string),
        tags: Vec::new(),
    };
    service::create_task(backend, &new_task, Utc::now())
        .await
        .expect("seed task")
}

/// Waits for a `TasksChanged` event satisfying a predicate.
async fn wait_for_tasks<F>(events: &mut mpsc::Receiver<BoardEvent>, mut predicate: F) -> Vec<Task>
where
    F: FnMut(&[Task]) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("board event within timeout")
            .expect("event channel open");
        if let BoardEvent::TasksChanged(tasks) = event {
            if predicate(&tasks) {
                return tasks;
            }
        }
    }
}

/// Asserts that no `TasksChanged` event arrives within `window`.
async fn assert_no_tasks_changed(events: &mut mpsc::Receiver<BoardEvent>, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return;
        }
        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Some(BoardEvent::TasksChanged(_))) => panic!("snapshot applied inside guard window"),
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => return,
        }
    }
}

// ---------------------------------------------------------------------------
// Guard window
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn external_edit_applies_immediately_when_board_is_idle() {
    let backend = Arc::new(MemoryStore::new());
    let id = seed_one(&backend, "Shared", USER, None, 0).await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());
    wait_for_tasks(&mut events, |tasks| tasks.len() == 1).await;

    // Another session edits the task; no local edit is in flight.
    backend
        .update(
            service::TASKS_COLLECTION,
            id.as_str(),
            json!({"title": "Renamed elsewhere"}),
        )
        .await
        .expect("external update");

    let tasks = wait_for_tasks(&mut events, |tasks| {
        tasks.first().is_some_and(|t| t.title == "Renamed elsewhere")
    })
    .await;
    assert_eq!(tasks.len(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_inside_guard_window_is_deferred_not_lost() {
    let backend = Arc::new(MemoryStore::new());
    let id_a = seed_one(&backend, "A", USER, None, 0).await;
    let id_b = seed_one(&backend, "B", USER, None, 1000).await;

    let config = BoardConfig::default();
    let guard_window = config.guard_window;
    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, config);
    wait_for_tasks(&mut events, |tasks| tasks.len() == 2).await;

    // A local drag opens the guard window (and produces its own events).
    let applied = handle
        .drag_end(DragEnd::onto_task(
            id_b.clone(),
            TaskStatus::Todo,
            id_a.clone(),
        ))
        .await;
    assert_eq!(applied.len(), 2);
    // Drain the optimistic TasksChanged.
    wait_for_tasks(&mut events, |_| true).await;

    // An external edit lands immediately after: its snapshot arrives
    // inside the guard window and must not clobber the board yet.
    backend
        .update(
            service::TASKS_COLLECTION,
            id_a.as_str(),
            json!({"title": "A-external"}),
        )
        .await
        .expect("external update");

    assert_no_tasks_changed(&mut events, guard_window / 2).await;

    // The deferred snapshot applies after the deferral delay; nothing
    // was lost. (The drag's own feed echo carries the same merged view.)
    let tasks = wait_for_tasks(&mut events, |tasks| {
        tasks.iter().any(|t| t.title == "A-external")
    })
    .await;
    assert_eq!(tasks.len(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn board_converges_to_authoritative_state_after_quiet_period() {
    let backend = Arc::new(MemoryStore::new());
    let id = seed_one(&backend, "Volatile", USER, None, 0).await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());
    wait_for_tasks(&mut events, |tasks| tasks.len() == 1).await;

    // Local drag, then an overlapping external status change.
    handle
        .drag_end(DragEnd::onto_column(id.clone(), TaskStatus::Review))
        .await;
    backend
        .update(
            service::TASKS_COLLECTION,
            id.as_str(),
            json!({"status": "done", "order": 42}),
        )
        .await
        .expect("external update");

    // Eventually the authoritative state (the external write, which
    // landed last) wins.
    let tasks = wait_for_tasks(&mut events, |tasks| {
        tasks.first().is_some_and(|t| t.status == TaskStatus::Done)
    })
    .await;
    assert_eq!(tasks[0].order, 42);

    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// Cross-feed deduplication
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn task_created_by_and_assigned_to_me_appears_once() {
    let backend = Arc::new(MemoryStore::new());
    // In both feeds: created by me AND assigned to me.
    seed_one(&backend, "Both feeds", USER, Some(USER), 0).await;
    // Only the assigned feed.
    seed_one(&backend, "Assigned only", OTHER, Some(USER), 1000).await;
    // Neither feed.
    seed_one(&backend, "Invisible", OTHER, Some(OTHER), 2000).await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());
    let tasks = wait_for_tasks(&mut events, |tasks| tasks.len() == 2).await;

    let both_count = tasks.iter().filter(|t| t.title == "Both feeds").count();
    assert_eq!(both_count, 1);
    assert!(tasks.iter().any(|t| t.title == "Assigned only"));
    assert!(!tasks.iter().any(|t| t.title == "Invisible"));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn assignment_from_another_session_joins_the_board() {
    let backend = Arc::new(MemoryStore::new());
    let id = seed_one(&backend, "Incoming", OTHER, None, 0).await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());

    // The board starts empty: the task is neither created by nor
    // assigned to this user.
    wait_for_tasks(&mut events, |tasks| tasks.is_empty()).await;

    // Another session assigns it to this user.
    backend
        .update(
            service::TASKS_COLLECTION,
            id.as_str(),
            json!({"assignedTo": USER}),
        )
        .await
        .expect("assign");

    let tasks = wait_for_tasks(&mut events, |tasks| tasks.len() == 1).await;
    assert_eq!(tasks[0].title, "Incoming");

    handle.shutdown().await;
}
