//! Fractional ordering for manually arranged task lists.
//!
//! A task dropped between two neighbours gets the midpoint of their order
//! keys, so only the moved task is rewritten. Repeated insertion at the
//! same spot eventually runs out of floating-point resolution; callers
//! detect that with [`gap_exhausted`] and spread the whole list out again
//! with [`renormalize`].

use std::cmp::Ordering;

use crate::task::Task;

/// Smallest neighbour gap accepted before the list must be re-normalized.
pub const DEFAULT_MIN_GAP: f64 = 1e-6;

/// Distance between consecutive orders after re-normalization.
pub const DEFAULT_RENORMALIZE_SPACING: f64 = 1000.0;

/// Order given to the first task of an empty list.
pub const FIRST_ORDER: f64 = 1.0;

/// Errors produced while computing an order key.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum OrderError {
    /// Neither neighbour was supplied, so there is nothing to anchor on.
    #[error("at least one of prevTaskId or nextTaskId is required")]
    MissingNeighbors,
    /// A neighbour order (or the computed result) is NaN or infinite.
    #[error("order value is not finite: {0}")]
    NonFinite(f64),
}

/// Computes the order key for a task placed between `prev` and `next`.
///
/// - both present: midpoint
/// - only `prev` (moved to the end): `prev + 1`
/// - only `next` (moved to the start): `next - 1`
///
/// # Errors
///
/// Returns [`OrderError::MissingNeighbors`] when both are absent and
/// [`OrderError::NonFinite`] for NaN or infinite inputs.
pub fn compute_order(prev: Option<f64>, next: Option<f64>) -> Result<f64, OrderError> {
    if let Some(bad) = [prev, next].into_iter().flatten().find(|v| !v.is_finite()) {
        return Err(OrderError::NonFinite(bad));
    }
    let order = match (prev, next) {
        (Some(p), Some(n)) => (p + n) / 2.0,
        (Some(p), None) => p + 1.0,
        (None, Some(n)) => n - 1.0,
        (None, None) => return Err(OrderError::MissingNeighbors),
    };
    if order.is_finite() {
        Ok(order)
    } else {
        Err(OrderError::NonFinite(order))
    }
}

/// Returns `true` when no usable key is left between `prev` and `next`.
///
/// That is the case when the gap is below `min_gap`, or when the midpoint
/// rounds onto one of the neighbours.
#[must_use]
pub fn gap_exhausted(prev: f64, next: f64, min_gap: f64) -> bool {
    let gap = next - prev;
    if gap.is_nan() || gap < min_gap {
        return true;
    }
    let mid = (prev + next) / 2.0;
    mid <= prev || mid >= next
}

/// Returns `true` when `order` does not land strictly between the
/// neighbours that are present.
///
/// Far from zero, `prev + 1` and `next - 1` round back onto the neighbour
/// itself, which would tie the moved task with it.
#[must_use]
pub fn key_collides(order: f64, prev: Option<f64>, next: Option<f64>) -> bool {
    prev.is_some_and(|p| order <= p) || next.is_some_and(|n| order >= n)
}

/// Order key for a newly created task appended after `last`.
#[must_use]
pub fn append_order(last: Option<f64>) -> f64 {
    last.map_or(FIRST_ORDER, |order| order + 1.0)
}

/// Total ordering used wherever an owner's list is presented.
///
/// Ties on `order` fall back to creation time and then id, so equal keys
/// still produce the same sequence on every load.
#[must_use]
pub fn compare_by_order(a: &Task, b: &Task) -> Ordering {
    a.order
        .total_cmp(&b.order)
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts `tasks` by [`compare_by_order`] and reassigns evenly spaced keys
/// `spacing, 2 * spacing, ...` preserving the current sequence.
pub fn renormalize(tasks: &mut [Task], spacing: f64) {
    tasks.sort_by(compare_by_order);
    let mut next = spacing;
    for task in tasks.iter_mut() {
        task.order = next;
        next += spacing;
    }
}
