//! Taskdeck demo driver.
//!
//! Seeds an in-memory backend with sample tasks, spawns a board session
//! for a member user, performs a couple of scripted drags, and prints
//! the resulting columns. Configuration via CLI flags, environment
//! variables, or config file (`~/.config/taskdeck/config.toml`).
//!
//! ```bash
//! cargo run --bin taskdeck
//! cargo run --bin taskdeck -- --user-id alice --log-level debug
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::board::session::TaskDraft;
use taskdeck::board::{BoardEvent, BoardHandle, DragEnd, spawn_board};
use taskdeck::config::{AppConfig, CliArgs};
use taskdeck::service;
use taskdeck_backend::auth::{Identity, StaticIdentity};
use taskdeck_backend::memory::MemoryStore;
use taskdeck_model::{BOARD_COLUMNS, DueFilter, NewTask, Priority, Task, TaskStatus, UserRole};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let config = match AppConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            AppConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("taskdeck starting");

    let identity = StaticIdentity::new(config.user_id.clone(), UserRole::Member);
    let Some(user) = identity.current_user() else {
        eprintln!("No signed-in user; nothing to show.");
        return;
    };
    if !user.role.can_view_board() {
        println!("Signed in as {} ({}): the board is not shown for this role.", user.id, user.role);
        return;
    }

    let backend = Arc::new(MemoryStore::new());
    seed_sample_tasks(backend.as_ref(), &user.id).await;

    let (handle, mut events) = spawn_board(Arc::clone(&backend), user.id.clone(), config.board);

    // Wait for the initial feed snapshot before dragging anything.
    let mut tasks = await_tasks(&mut events).await;
    println!("Board for {} ({} tasks)", user.id, tasks.len());
    print_board(&tasks);

    run_scripted_drags(&handle, &mut events, &mut tasks).await;

    handle.shutdown().await;
    tracing::info!("taskdeck exiting");
}

/// Initialize logging. With `--log-file`, entries go through a
/// non-blocking file appender; the returned guard must be held until
/// shutdown so buffered entries flush. Otherwise logs go to stderr.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some(path) = file_path {
        let dir = path.parent()?;
        let file_name = path.file_name()?.to_str()?;
        let file_appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        None
    }
}

/// Seeds the demo backend with a representative board.
async fn seed_sample_tasks(backend: &MemoryStore, user_id: &str) {
    let now = Utc::now();
    let samples = [
        (
            "Design system documentation",
            "Create comprehensive documentation for our design system components",
            Priority::High,
            TaskStatus::Todo,
            1000,
            None,
            vec!["documentation", "design", "frontend"],
        ),
        (
            "Fix login form validation",
            "Address the validation issues in the user authentication flow",
            Priority::High,
            TaskStatus::InProgress,
            2000,
            Some(now + ChronoDuration::hours(24)),
            vec!["bug", "frontend", "auth"],
        ),
        (
            "Code review for API endpoints",
            "Review the new REST API endpoints for the user management system",
            Priority::Medium,
            TaskStatus::Review,
            3000,
            None,
            vec!["code-review", "backend", "api"],
        ),
        (
            "Deploy staging environment",
            "Set up and configure the staging environment for testing",
            Priority::Medium,
            TaskStatus::Done,
            4000,
            None,
            vec!["devops", "deployment"],
        ),
        (
            "Update user profile component",
            "Add support for profile picture uploads and bio sections",
            Priority::Low,
            TaskStatus::Todo,
            5000,
            Some(now + ChronoDuration::days(7)),
            vec!["frontend", "feature"],
        ),
        (
            "Database optimization",
            "Optimize database queries for better performance on large datasets",
            Priority::High,
            TaskStatus::InProgress,
            6000,
            None,
            vec!["backend", "performance", "database"],
        ),
    ];

    for (title, description, priority, status, order, due_date, tags) in samples {
        let new_task = NewTask {
            title: title.to_string(),
            description: Some(description.to_string()),
            priority,
            status,
            order,
            due_date,
            created_by: user_id.to_string(),
            assigned_to: None,
            tags: tags.into_iter().map(str::to_string).collect(),
        };
        if let Err(error) = service::create_task(backend, &new_task, now).await {
            tracing::error!(%error, title, "failed to seed sample task");
        }
    }
}

/// Waits for the next `TasksChanged` event, draining everything else.
async fn await_tasks(events: &mut mpsc::Receiver<BoardEvent>) -> Vec<Task> {
    loop {
        match events.recv().await {
            Some(BoardEvent::TasksChanged(tasks)) => return tasks,
            Some(_) => {}
            None => return Vec::new(),
        }
    }
}

/// Drains pending events for a short settle period, keeping the latest
/// task list and echoing notices.
async fn settle(events: &mut mpsc::Receiver<BoardEvent>, tasks: &mut Vec<Task>) {
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(100), events.recv()).await
    {
        match event {
            BoardEvent::TasksChanged(latest) => *tasks = latest,
            BoardEvent::Notice(notice) => println!("  [{:?}] {}", notice.kind, notice.text),
            BoardEvent::NoticeCleared | BoardEvent::TaskPersisted { .. } => {}
        }
    }
}

/// Performs the two scripted drags: a within-column reorder and a
/// cross-column move onto a column body.
async fn run_scripted_drags(
    handle: &BoardHandle,
    events: &mut mpsc::Receiver<BoardEvent>,
    tasks: &mut Vec<Task>,
) {
    let todo: Vec<_> = taskdeck_model::reorder_column(tasks, TaskStatus::Todo)
        .iter()
        .map(|t| t.id.clone())
        .collect();

    if let [first, second, ..] = todo.as_slice() {
        println!("\nDragging the second To Do card above the first...");
        let applied = handle
            .drag_end(DragEnd::onto_task(
                second.clone(),
                TaskStatus::Todo,
                first.clone(),
            ))
            .await;
        println!("  {} records written", applied.len());
        settle(events, tasks).await;
        print_board(tasks);
    }

    if let Some(card) = todo.first() {
        println!("\nDropping the first To Do card onto Done...");
        let applied = handle
            .drag_end(DragEnd::onto_column(card.clone(), TaskStatus::Done))
            .await;
        println!("  {} records written", applied.len());
        settle(events, tasks).await;
        print_board(tasks);
    }

    println!("\nCreating a fresh task...");
    if handle.create_task(TaskDraft::titled("Try the demo")).await.is_some() {
        // The feed echo may sit out the guard window before it lands.
        wait_for_title(events, tasks, "Try the demo").await;
        print_board(tasks);
    }
}

/// Waits until a `TasksChanged` event carries a task with the given
/// title, keeping the latest list. Gives up after a few seconds.
async fn wait_for_title(
    events: &mut mpsc::Receiver<BoardEvent>,
    tasks: &mut Vec<Task>,
    title: &str,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(BoardEvent::TasksChanged(latest))) => {
                *tasks = latest;
                if tasks.iter().any(|t| t.title == title) {
                    return;
                }
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => return,
        }
    }
}

/// Prints the board, one column per line, cards in display order, plus
/// the presentational filter summaries.
fn print_board(tasks: &[Task]) {
    for status in BOARD_COLUMNS {
        let titles: Vec<&str> = taskdeck_model::display_column(tasks, status)
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        println!("  {:<12} {}", status.title(), titles.join(" | "));
    }
    let now = Utc::now();
    let high = taskdeck_model::filter_tasks(tasks, Some(Priority::High), DueFilter::All, now).len();
    let due_soon = taskdeck_model::filter_tasks(tasks, None, DueFilter::DueSoon, now).len();
    println!("  {high} high priority, {due_soon} due within 24h");
}
