//! Property-based tests for fractional ordering.
//!
//! Uses proptest to verify:
//! 1. A midpoint always lands strictly between its neighbours while the gap
//!    is still usable.
//! 2. End and start placement are exactly `prev + 1` and `next - 1`.
//! 3. Any sequence of moves keeps an owner's list strictly ordered when
//!    exhausted gaps are re-normalized first.

use letsfocus_proto::order::{
    DEFAULT_MIN_GAP, DEFAULT_RENORMALIZE_SPACING, compare_by_order, compute_order, gap_exhausted,
    renormalize,
};
use letsfocus_proto::task::{OwnerId, Priority, Task, TaskId, TaskStatus};
use proptest::prelude::*;

fn make_task(order: f64, created_at: u64) -> Task {
    Task {
        id: TaskId::new(),
        owner: OwnerId::new("prop"),
        title: format!("task {created_at}"),
        description: None,
        status: TaskStatus::Todo,
        priority: Priority::Medium,
        focus: false,
        tags: Vec::new(),
        group_id: None,
        due_date: None,
        order,
        created_at,
        updated_at: created_at,
    }
}

/// Strategy for finite order keys in a realistic range.
fn arb_order() -> impl Strategy<Value = f64> {
    -1.0e12..1.0e12_f64
}

/// Moves the task at `from` so it sits at `to` in the sorted list, the
/// same way the reorder endpoint does, and returns the new sorted list.
fn apply_move(mut tasks: Vec<Task>, from: usize, to: usize) -> Vec<Task> {
    tasks.sort_by(compare_by_order);
    let moving = tasks.remove(from);
    let to = to.min(tasks.len());

    let neighbour_orders = |list: &[Task]| {
        let prev = to.checked_sub(1).map(|i| list[i].order);
        let next = list.get(to).map(|t| t.order);
        (prev, next)
    };

    let (mut prev, mut next) = neighbour_orders(&tasks);
    if let (Some(p), Some(n)) = (prev, next) {
        if gap_exhausted(p, n, DEFAULT_MIN_GAP) {
            renormalize(&mut tasks, DEFAULT_RENORMALIZE_SPACING);
            (prev, next) = neighbour_orders(&tasks);
        }
    }

    let mut moved = moving;
    moved.order = compute_order(prev, next).unwrap();
    tasks.insert(to, moved);
    tasks
}

proptest! {
    #[test]
    fn midpoint_strictly_between(a in arb_order(), b in arb_order()) {
        let (prev, next) = if a < b { (a, b) } else { (b, a) };
        prop_assume!(!gap_exhausted(prev, next, DEFAULT_MIN_GAP));
        let mid = compute_order(Some(prev), Some(next)).unwrap();
        prop_assert!(prev < mid && mid < next, "{prev} < {mid} < {next}");
    }

    #[test]
    fn end_placement_adds_one(prev in arb_order()) {
        prop_assert_eq!(compute_order(Some(prev), None).unwrap(), prev + 1.0);
    }

    #[test]
    fn start_placement_subtracts_one(next in arb_order()) {
        prop_assert_eq!(compute_order(None, Some(next)).unwrap(), next - 1.0);
    }

    #[test]
    fn moves_preserve_strict_total_order(
        len in 2usize..12,
        moves in prop::collection::vec((0usize..12, 0usize..12), 1..200),
    ) {
        let mut tasks: Vec<Task> = (0..len)
            .map(|i| make_task(f64::from(u32::try_from(i).unwrap()) + 1.0, i as u64))
            .collect();
        for (from, to) in moves {
            let from = from % tasks.len();
            let expected_id = {
                let mut sorted = tasks.clone();
                sorted.sort_by(compare_by_order);
                sorted[from].id.clone()
            };
            tasks = apply_move(tasks, from, to);
            let landed = to.min(tasks.len() - 1);
            prop_assert_eq!(&tasks[landed].id, &expected_id);
            for pair in tasks.windows(2) {
                prop_assert!(pair[0].order < pair[1].order);
            }
        }
    }
}
