//! Property-based tests for the reorder planner.
//!
//! Uses proptest to verify, over arbitrary boards and gestures:
//! 1. Planning is idempotent: same snapshot + gesture, same plan.
//! 2. Dropping a card onto itself yields an empty plan.
//! 3. Plans renumber with strictly increasing, step-aligned orders.
//! 4. Applying a plan makes the column's order-ascending read-back
//!    match the plan's sequence exactly.
//! 5. Tasks outside the target column are never touched by a card drop.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use taskdeck::board::store::TaskStore;
use taskdeck::board::{DragEnd, plan_drop};
use taskdeck_model::{Priority, Task, TaskId, TaskStatus};

const STEP: i64 = 1000;

// --- Strategies -----------------------------------------------------------

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Review),
        Just(TaskStatus::Done),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

fn base_time(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_770_000_000 + offset_secs, 0)
        .single()
        .expect("valid timestamp")
}

/// A board of up to 12 tasks with distinct ids and arbitrary columns,
/// priorities, and (possibly colliding) order values.
fn arb_board() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((arb_status(), arb_priority(), -10_000i64..10_000), 1..12).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(index, (status, priority, order))| Task {
                    id: TaskId::from_raw(format!("task-{index}")),
                    title: format!("Task {index}"),
                    description: None,
                    priority,
                    status,
                    order,
                    due_date: None,
                    created_by: "user-a".to_string(),
                    assigned_to: None,
                    tags: Vec::new(),
                    comments: Vec::new(),
                    created_at: base_time(i64::try_from(index).unwrap_or(0)),
                    updated_at: base_time(i64::try_from(index).unwrap_or(0)),
                })
                .collect()
        },
    )
}

/// A board plus a gesture referencing tasks that exist on it.
fn arb_board_and_drag() -> impl Strategy<Value = (Vec<Task>, DragEnd)> {
    (arb_board(), any::<prop::sample::Index>()).prop_flat_map(|(board, active_index)| {
        let active = board[active_index.index(board.len())].id.clone();
        let len = board.len();
        (
            Just(board),
            Just(active),
            arb_status(),
            prop::option::of(any::<prop::sample::Index>().prop_map(move |i| i.index(len))),
        )
            .prop_map(|(board, active, target_column, target_index)| {
                let target_task = target_index.map(|i| board[i].id.clone());
                let drag = DragEnd {
                    active_task: active,
                    target_column,
                    target_task,
                };
                (board, drag)
            })
    })
}

// --- Properties -----------------------------------------------------------

proptest! {
    /// Same snapshot and gesture always produce the same plan.
    #[test]
    fn planning_is_idempotent((board, drag) in arb_board_and_drag()) {
        let first = plan_drop(&board, &drag, STEP);
        let second = plan_drop(&board, &drag, STEP);
        prop_assert_eq!(first, second);
    }

    /// Dropping a card onto itself never produces updates.
    #[test]
    fn self_drop_is_a_no_op(board in arb_board(), index in any::<prop::sample::Index>()) {
        let task = &board[index.index(board.len())];
        let drag = DragEnd::onto_task(task.id.clone(), task.status, task.id.clone());
        let plan = plan_drop(&board, &drag, STEP).expect("known ids");
        prop_assert!(plan.is_empty());
    }

    /// Card-drop plans renumber the whole column: strictly increasing,
    /// step-aligned orders starting at zero.
    #[test]
    fn card_drop_plans_are_step_aligned((board, drag) in arb_board_and_drag()) {
        if drag.target_task.is_none() {
            return Ok(());
        }
        let plan = plan_drop(&board, &drag, STEP).expect("known ids");
        for (index, update) in plan.iter().enumerate() {
            prop_assert_eq!(update.order, i64::try_from(index).unwrap() * STEP);
            prop_assert_eq!(update.status, drag.target_column);
        }
    }

    /// After applying a plan, iterating the target column by ascending
    /// order yields exactly the plan's sequence.
    #[test]
    fn read_back_matches_the_plan((board, drag) in arb_board_and_drag()) {
        let plan = match plan_drop(&board, &drag, STEP) {
            Ok(plan) if !plan.is_empty() => plan,
            _ => return Ok(()),
        };
        if drag.target_task.is_none() {
            // Column-body drops emit one record, not the full column
            // sequence; only card drops pin the whole read-back.
            return Ok(());
        }

        let mut store = TaskStore::new();
        store.replace_all(board);
        store.apply_updates(&plan, base_time(999));

        let read_back: Vec<&TaskId> = store
            .reorder_column(drag.target_column)
            .iter()
            .map(|t| &t.id)
            .collect();
        let planned: Vec<&TaskId> = plan.iter().map(|u| &u.id).collect();
        prop_assert_eq!(read_back, planned);
    }

    /// A card drop never emits updates for tasks outside the target
    /// column's working list.
    #[test]
    fn card_drops_touch_only_the_target_column((board, drag) in arb_board_and_drag()) {
        if drag.target_task.is_none() {
            return Ok(());
        }
        let plan = plan_drop(&board, &drag, STEP).expect("known ids");
        for update in &plan {
            let task = board.iter().find(|t| t.id == update.id).expect("planned id exists");
            let in_target_column = task.status == drag.target_column;
            let is_active = task.id == drag.active_task;
            prop_assert!(in_target_column || is_active);
        }
    }
}
