//! Order assignment for drag-and-drop reordering.
//!
//! A reorder reads the moved task and its intended neighbours, computes
//! the new order key, and writes it back with a guarded write that fails
//! if that neighbourhood changed in between. When the neighbours are too
//! close to split, the owner's list is re-normalized first.

use std::future::Future;

use letsfocus_proto::api::ReorderRequest;
use letsfocus_proto::order::{OrderError, compute_order, gap_exhausted, key_collides};
use letsfocus_proto::task::{OwnerId, Task, TaskId};

use crate::config::OrderingConfig;
use crate::store::{Neighbourhood, StoreError, TaskStore};

/// Number of read-compute-write rounds before a conflict is reported.
const MAX_ATTEMPTS: u32 = 2;

/// Errors surfaced by [`reorder_task`].
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    /// The request cannot be satisfied as given.
    #[error("invalid reorder request: {0}")]
    InvalidRequest(String),

    /// The task or a neighbour does not resolve for this owner.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The list kept changing underneath the request, or the caller's
    /// neighbours are no longer adjacent.
    #[error("task list changed; reload and try again")]
    Conflict,

    /// The store failed to persist the change.
    #[error(transparent)]
    Store(StoreError),
}

/// A completed reorder.
#[derive(Debug, Clone)]
pub struct ReorderOutcome {
    /// The moved task with its new order.
    pub task: Task,
    /// Whether the owner's list had to be re-normalized first.
    pub renormalized: bool,
}

/// Moves `request.task_id` between the requested neighbours.
///
/// Only the moved task is written, unless the neighbour gap is exhausted,
/// in which case every active task of the owner is re-spaced first.
///
/// # Errors
///
/// See [`ReorderError`]. Nothing is written when an error is returned,
/// except a re-normalization pass that already completed.
pub async fn reorder_task(
    store: &TaskStore,
    owner: &OwnerId,
    request: &ReorderRequest,
    ordering: OrderingConfig,
) -> Result<ReorderOutcome, ReorderError> {
    reorder_with(store, owner, request, ordering, |_| std::future::ready(())).await
}

/// [`reorder_task`] with `before_write` awaited after each plan, right
/// before the guarded write of that attempt.
async fn reorder_with<F, Fut>(
    store: &TaskStore,
    owner: &OwnerId,
    request: &ReorderRequest,
    ordering: OrderingConfig,
    mut before_write: F,
) -> Result<ReorderOutcome, ReorderError>
where
    F: FnMut(u32) -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    if request.prev_task_id.is_none() && request.next_task_id.is_none() {
        tracing::warn!(owner = %owner, task = %request.task_id, "reorder without neighbours");
        return Err(ReorderError::InvalidRequest(
            OrderError::MissingNeighbors.to_string(),
        ));
    }

    let target = resolve_id(&request.task_id)?;
    let prev = request.prev_task_id.as_deref().map(resolve_id).transpose()?;
    let next = request.next_task_id.as_deref().map(resolve_id).transpose()?;

    if prev.as_ref() == Some(&target) || next.as_ref() == Some(&target) {
        return Err(ReorderError::InvalidRequest(
            "a task cannot be its own neighbour".to_string(),
        ));
    }
    if prev.is_some() && prev == next {
        return Err(ReorderError::InvalidRequest(
            "prevTaskId and nextTaskId must differ".to_string(),
        ));
    }

    let mut renormalized = false;
    for attempt in 1..=MAX_ATTEMPTS {
        let (hood, order) = plan(
            store,
            owner,
            &target,
            prev.as_ref(),
            next.as_ref(),
            ordering,
            &mut renormalized,
        )
        .await?;
        before_write(attempt).await;

        match store.write_order_guarded(owner, order, &hood).await {
            Ok(task) => {
                tracing::info!(
                    owner = %owner,
                    task = %task.id,
                    order = task.order,
                    renormalized,
                    attempt,
                    "task reordered"
                );
                return Ok(ReorderOutcome { task, renormalized });
            }
            Err(StoreError::Conflict(changed)) => {
                tracing::warn!(
                    owner = %owner,
                    task = %target,
                    changed = %changed,
                    attempt,
                    "reorder neighbourhood changed before write"
                );
            }
            Err(e) => return Err(map_store_error(e)),
        }
    }

    Err(ReorderError::Conflict)
}

/// Reads the neighbourhood and computes the new order, re-normalizing the
/// owner's list at most once per request if the gap is exhausted or the
/// key would land on a neighbour.
async fn plan(
    store: &TaskStore,
    owner: &OwnerId,
    target: &TaskId,
    prev: Option<&TaskId>,
    next: Option<&TaskId>,
    ordering: OrderingConfig,
    renormalized: &mut bool,
) -> Result<(Neighbourhood, f64), ReorderError> {
    loop {
        let hood = store
            .read_neighbourhood(owner, target, prev, next)
            .await
            .map_err(map_store_error)?;
        let prev_order = hood.prev.as_ref().map(|g| g.order);
        let next_order = hood.next.as_ref().map(|g| g.order);

        let crowded = match (prev_order, next_order) {
            (Some(p), Some(n)) if p > n => {
                return Err(ReorderError::InvalidRequest(
                    "prevTaskId must come before nextTaskId".to_string(),
                ));
            }
            (Some(p), Some(n)) => gap_exhausted(p, n, ordering.min_gap),
            _ => false,
        };

        let order = compute_order(prev_order, next_order)
            .map_err(|e| ReorderError::InvalidRequest(e.to_string()))?;
        let collides = key_collides(order, prev_order, next_order);

        if (crowded || collides) && !*renormalized {
            let count = store
                .renormalize(owner, ordering.renormalize_spacing)
                .await
                .map_err(map_store_error)?;
            tracing::info!(owner = %owner, count, crowded, collides, "order gap exhausted, list renormalized");
            *renormalized = true;
            continue;
        }
        if collides {
            tracing::warn!(owner = %owner, task = %target, order, "no free key even after renormalization");
            return Err(ReorderError::Conflict);
        }
        return Ok((hood, order));
    }
}

/// Parses a wire id; anything unparsable cannot resolve to a task.
fn resolve_id(raw: &str) -> Result<TaskId, ReorderError> {
    TaskId::parse(raw).ok_or_else(|| ReorderError::NotFound(raw.to_string()))
}

fn map_store_error(error: StoreError) -> ReorderError {
    match error {
        StoreError::NotFound(id) => ReorderError::NotFound(id.to_string()),
        StoreError::Inactive(id) => {
            ReorderError::InvalidRequest(format!("task {id} is not in the active list"))
        }
        StoreError::Conflict(id) => {
            tracing::warn!(intruder = %id, "reorder neighbours are not adjacent");
            ReorderError::Conflict
        }
        other => ReorderError::Store(other),
    }
}
