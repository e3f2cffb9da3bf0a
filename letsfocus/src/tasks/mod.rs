//! Local model of one owner's task list.
//!
//! The client never reorders tasks on its own authority: a drag is planned
//! locally, sent to the server, and only applied once the server has
//! acknowledged it with the order it persisted.

pub mod list;

pub use list::{PendingMove, TaskList};

use std::future::Future;

use letsfocus_proto::api::{ReorderRequest, ReorderResponse};
use letsfocus_proto::order::OrderError;
use letsfocus_proto::task::Task;
use thiserror::Error;

use crate::client::ClientError;

/// Errors that can occur during task list operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task with the given ID is not in the list.
    #[error("task not found: {0}")]
    TaskNotFound(String),
    /// Completed and deleted tasks have no manual position.
    #[error("task {0} is not in the active list")]
    Inactive(String),
    /// Target position is past the end of the list.
    #[error("position {index} out of range (list has {len} tasks)")]
    IndexOutOfRange {
        /// Requested zero-based position.
        index: usize,
        /// Number of active tasks.
        len: usize,
    },
    /// A single-task list has no neighbours to move between.
    #[error("nothing to move: the list has only one active task")]
    NothingToMove,
    /// The acknowledged move does not belong to this list.
    #[error("pending move for {0} no longer matches the list")]
    StaleMove(String),
    /// The neighbour orders could not produce a key.
    #[error(transparent)]
    Order(#[from] OrderError),
    /// The server rejected or never received the move.
    #[error(transparent)]
    Remote(#[from] ClientError),
}

/// The server calls a [`TaskList`] needs to stay in sync.
///
/// Implemented by [`crate::client::ApiClient`]; tests substitute an
/// in-memory fake.
pub trait TaskTransport: Send + Sync {
    /// Fetches the owner's current tasks.
    fn list(&self) -> impl Future<Output = Result<Vec<Task>, ClientError>> + Send;

    /// Sends a reorder and returns the server's acknowledgement.
    fn reorder(
        &self,
        request: &ReorderRequest,
    ) -> impl Future<Output = Result<ReorderResponse, ClientError>> + Send;
}
