//! Integration tests for persistence failure handling.
//!
//! A failed write must roll the board back to the exact pre-drag state,
//! raise a transient error notice that auto-dismisses, and leave every
//! remote record untouched. Failures are never retried.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use taskdeck::board::{BoardEvent, DragEnd, NoticeKind, spawn_board};
use taskdeck::config::BoardConfig;
use taskdeck::service;
use taskdeck_backend::memory::MemoryStore;
use taskdeck_model::{NewTask, Priority, Task, TaskId, TaskStatus};
use tokio::sync::mpsc;

const USER: &str = "user-a";

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

async fn seed(backend: &MemoryStore, rows: &[(&str, TaskStatus, i64)]) -> Vec<TaskId> {
    let mut ids = Vec::new();
    for (title, status, order) in rows {
        let new_task = NewTask {
            title: (*title).to_string(),
            description: None,
            priority: Priority::Medium,
            status: *status,
            order: *order,
            due_date: None,
            created_by: USER.to_string(),
            assigned_to: None,
            tags: Vec::new(),
        };
        ids.push(
            service::create_task(backend, &new_task, Utc::now())
                .await
                .expect("seed task"),
        );
    }
    ids
}

async fn next_event(events: &mut mpsc::Receiver<BoardEvent>) -> BoardEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("board event within timeout")
        .expect("event channel open")
}

async fn wait_for_board(events: &mut mpsc::Receiver<BoardEvent>, expected: usize) -> Vec<Task> {
    loop {
        if let BoardEvent::TasksChanged(tasks) = next_event(events).await {
            if tasks.len() == expected {
                return tasks;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_batch_rolls_the_board_back_to_the_pre_drag_state() {
    let backend = Arc::new(MemoryStore::new());
    let ids = seed(
        &backend,
        &[
            ("A", TaskStatus::Todo, 0),
            ("B", TaskStatus::Todo, 1000),
            ("C", TaskStatus::Todo, 2000),
        ],
    )
    .await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());
    let initial = wait_for_board(&mut events, 3).await;

    backend.set_fail_writes(true);
    let applied = handle
        .drag_end(DragEnd::onto_task(
            ids[2].clone(),
            TaskStatus::Todo,
            ids[0].clone(),
        ))
        .await;
    assert!(applied.is_empty());

    // The optimistic apply was visible first, then the rollback: the
    // final list is deep-equal to the pre-drag snapshot.
    let optimistic = wait_for_board(&mut events, 3).await;
    assert_ne!(optimistic, initial);
    let rolled_back = wait_for_board(&mut events, 3).await;
    assert_eq!(rolled_back, initial);

    // Remote records are untouched (the batch is all-or-nothing).
    for (id, order) in [(&ids[0], 0), (&ids[1], 1000), (&ids[2], 2000)] {
        let doc = backend
            .get(service::TASKS_COLLECTION, id.as_str())
            .expect("record exists");
        assert_eq!(doc["order"], order);
        assert_eq!(doc["status"], "todo");
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failure_notice_replaces_success_and_auto_dismisses() {
    let backend = Arc::new(MemoryStore::new());
    let ids = seed(
        &backend,
        &[("A", TaskStatus::Todo, 0), ("B", TaskStatus::Todo, 1000)],
    )
    .await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());
    wait_for_board(&mut events, 2).await;

    backend.set_fail_writes(true);
    handle
        .drag_end(DragEnd::onto_task(
            ids[1].clone(),
            TaskStatus::Todo,
            ids[0].clone(),
        ))
        .await;

    // Optimistic success feedback first, unconditionally; the failure
    // notice follows once the write fails; then auto-dismissal.
    let mut kinds = Vec::new();
    loop {
        match next_event(&mut events).await {
            BoardEvent::Notice(notice) => kinds.push(notice.kind),
            BoardEvent::NoticeCleared => break,
            BoardEvent::TasksChanged(_) | BoardEvent::TaskPersisted { .. } => {}
        }
    }
    assert_eq!(kinds, vec![NoticeKind::Success, NoticeKind::Error]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn no_automatic_retry_after_failure() {
    let backend = Arc::new(MemoryStore::new());
    let ids = seed(
        &backend,
        &[("A", TaskStatus::Todo, 0), ("B", TaskStatus::Todo, 1000)],
    )
    .await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());
    wait_for_board(&mut events, 2).await;

    backend.set_fail_writes(true);
    handle
        .drag_end(DragEnd::onto_task(
            ids[1].clone(),
            TaskStatus::Todo,
            ids[0].clone(),
        ))
        .await;

    // Give any (incorrect) retry plenty of simulated time to land.
    tokio::time::sleep(Duration::from_secs(10)).await;
    backend.set_fail_writes(false);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(
        backend
            .get(service::TASKS_COLLECTION, ids[0].as_str())
            .expect("record exists")["order"],
        0
    );

    // Re-attempting the drag by hand succeeds now.
    let applied = handle
        .drag_end(DragEnd::onto_task(
            ids[1].clone(),
            TaskStatus::Todo,
            ids[0].clone(),
        ))
        .await;
    assert_eq!(applied.len(), 2);
    assert_eq!(
        backend
            .get(service::TASKS_COLLECTION, ids[1].as_str())
            .expect("record exists")["order"],
        0
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn successful_drag_fans_out_per_record_confirmations() {
    let backend = Arc::new(MemoryStore::new());
    let ids = seed(
        &backend,
        &[
            ("A", TaskStatus::Todo, 0),
            ("B", TaskStatus::Todo, 1000),
            ("C", TaskStatus::Todo, 2000),
        ],
    )
    .await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), USER, BoardConfig::default());
    wait_for_board(&mut events, 3).await;

    handle
        .drag_end(DragEnd::onto_task(
            ids[2].clone(),
            TaskStatus::Todo,
            ids[0].clone(),
        ))
        .await;

    let mut persisted = Vec::new();
    while persisted.len() < 3 {
        if let BoardEvent::TaskPersisted { id, patch } = next_event(&mut events).await {
            assert!(patch.status.is_some());
            assert!(patch.order.is_some());
            persisted.push(id);
        }
    }
    for id in &ids {
        assert!(persisted.contains(id));
    }

    handle.shutdown().await;
}
