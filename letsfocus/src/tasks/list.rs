//! Ordered task list with server-acknowledged moves.

use letsfocus_proto::api::ReorderRequest;
use letsfocus_proto::order::{compare_by_order, compute_order};
use letsfocus_proto::task::{Task, TaskId};

use super::{TaskError, TaskTransport};

/// A move that has been planned but not yet acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    /// Task being moved.
    pub task_id: TaskId,
    /// Current zero-based position among active tasks.
    pub from_index: usize,
    /// Intended zero-based position among active tasks after the move.
    pub to_index: usize,
    /// Body to send to the server.
    pub request: ReorderRequest,
    /// Order the server will assign unless it has to re-normalize first.
    pub expected_order: f64,
}

/// One owner's tasks, kept sorted by manual order.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    /// Creates a list from tasks in any order.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut list = Self { tasks };
        list.tasks.sort_by(compare_by_order);
        list
    }

    /// Replaces the contents with a fresh server listing.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        *self = Self::new(tasks);
    }

    /// All tasks, completed ones included, in manual order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Active tasks in manual order; positions refer to this sequence.
    pub fn active(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.is_active())
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Zero-based position of a task among active tasks.
    #[must_use]
    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.active().position(|t| &t.id == id)
    }

    /// Plans moving `task_id` so it ends up at `to_index` among the active
    /// tasks. Local state is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] or [`TaskError::Inactive`] for a
    /// task that cannot be moved, [`TaskError::IndexOutOfRange`] for a
    /// target past the end, and [`TaskError::NothingToMove`] when the task
    /// is the only active one.
    pub fn plan_move(&self, task_id: &TaskId, to_index: usize) -> Result<PendingMove, TaskError> {
        let task = self
            .get(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;
        if !task.is_active() {
            return Err(TaskError::Inactive(task_id.to_string()));
        }

        let from_index = self
            .position(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;
        let rest: Vec<&Task> = self.active().filter(|t| &t.id != task_id).collect();
        if rest.is_empty() {
            return Err(TaskError::NothingToMove);
        }
        if to_index > rest.len() {
            return Err(TaskError::IndexOutOfRange {
                index: to_index,
                len: rest.len() + 1,
            });
        }

        let prev = to_index.checked_sub(1).and_then(|i| rest.get(i)).copied();
        let next = rest.get(to_index).copied();
        let expected_order = compute_order(prev.map(|t| t.order), next.map(|t| t.order))?;

        Ok(PendingMove {
            task_id: task_id.clone(),
            from_index,
            to_index,
            request: ReorderRequest {
                task_id: task_id.to_string(),
                prev_task_id: prev.map(|t| t.id.to_string()),
                next_task_id: next.map(|t| t.id.to_string()),
            },
            expected_order,
        })
    }

    /// Applies the order the server persisted for `pending`.
    ///
    /// Returns `false` when the moved task does not land at the planned
    /// position, which happens when the server re-normalized the list
    /// first; the caller should then reload.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::StaleMove`] if the task is no longer active in
    /// this list.
    pub fn commit(&mut self, pending: &PendingMove, server_order: f64) -> Result<bool, TaskError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == pending.task_id && t.is_active())
            .ok_or_else(|| TaskError::StaleMove(pending.task_id.to_string()))?;
        task.order = server_order;
        self.tasks.sort_by(compare_by_order);
        Ok(self.position(&pending.task_id) == Some(pending.to_index))
    }

    /// Plans, sends, and commits a move.
    ///
    /// On any error before the server acknowledges, the list is unchanged.
    /// If the server re-normalized, or the acknowledged order does not fit
    /// the local list, the list is reloaded from `transport`. Returns the
    /// persisted order.
    ///
    /// # Errors
    ///
    /// Returns the planning errors of [`plan_move`](Self::plan_move), or
    /// [`TaskError::Remote`] if the server rejects the move or the reload
    /// fails.
    pub async fn move_task<T: TaskTransport>(
        &mut self,
        transport: &T,
        task_id: &TaskId,
        to_index: usize,
    ) -> Result<f64, TaskError> {
        let pending = self.plan_move(task_id, to_index)?;
        let ack = match transport.reorder(&pending.request).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(task = %task_id, error = %e, "reorder rejected, list unchanged");
                return Err(e.into());
            }
        };

        let landed = self.commit(&pending, ack.order)?;
        if ack.renormalized || !landed {
            tracing::info!(
                task = %task_id,
                order = ack.order,
                renormalized = ack.renormalized,
                "server order differs, reloading list"
            );
            self.refresh(transport).await?;
        }
        Ok(ack.order)
    }

    /// Reloads the list from the server.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Remote`] if the listing fails; the list is then
    /// unchanged.
    pub async fn refresh<T: TaskTransport>(&mut self, transport: &T) -> Result<(), TaskError> {
        let tasks = transport.list().await?;
        tracing::debug!(count = tasks.len(), "task list reloaded");
        self.replace(tasks);
        Ok(())
    }
}
