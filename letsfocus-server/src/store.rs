//! Shared task table with optional snapshot persistence.
//!
//! The [`TaskStore`] keeps every task in memory behind a [`RwLock`]. When a
//! data file is configured, each mutation first writes a full postcard
//! snapshot of the would-be state (temp file + rename) and only then
//! updates memory, so a failed write leaves both sides unchanged.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use letsfocus_proto::order::{append_order, compare_by_order, renormalize};
use letsfocus_proto::snapshot::{self, SnapshotError, StoreSnapshot};
use letsfocus_proto::task::{OwnerId, Task, TaskId, TaskStatus, now_ms};
use tokio::sync::RwLock;

/// Errors raised by [`TaskStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task with this id exists for the owner.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task exists but is completed or deleted.
    #[error("task {0} is not in the active list")]
    Inactive(TaskId),

    /// The neighbourhood of a reorder changed since it was read, or the
    /// supplied neighbours are not adjacent in the current list.
    #[error("task list changed around task {0}")]
    Conflict(TaskId),

    /// The snapshot could not be encoded or decoded.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Reading or writing the data file failed.
    #[error("data file {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Expected order of one task at the time a reorder was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderGuard {
    pub task_id: TaskId,
    pub order: f64,
}

impl OrderGuard {
    /// Captures the current order of `task`.
    #[must_use]
    pub fn of(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            order: task.order,
        }
    }
}

/// A moved task plus the neighbours it is dropped between.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbourhood {
    pub target: OrderGuard,
    pub prev: Option<OrderGuard>,
    pub next: Option<OrderGuard>,
}

impl Neighbourhood {
    /// All guarded rows, target first.
    pub fn guards(&self) -> impl Iterator<Item = &OrderGuard> {
        std::iter::once(&self.target)
            .chain(self.prev.as_ref())
            .chain(self.next.as_ref())
    }

    /// Finds an active task of `owner`, other than the guarded ones, whose
    /// order lies strictly between the neighbours. An absent neighbour
    /// leaves that side open.
    fn intruder<'a>(
        &self,
        tasks: impl Iterator<Item = &'a Task>,
        owner: &OwnerId,
    ) -> Option<TaskId> {
        let lower = self.prev.as_ref().map(|g| g.order);
        let upper = self.next.as_ref().map(|g| g.order);
        tasks
            .filter(|t| &t.owner == owner && t.is_active())
            .filter(|t| self.guards().all(|g| g.task_id != t.id))
            .find(|t| lower.is_none_or(|l| t.order > l) && upper.is_none_or(|u| t.order < u))
            .map(|t| t.id.clone())
    }
}

/// In-memory task table shared by all request handlers.
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    data_file: Option<PathBuf>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Creates an empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            data_file: None,
        }
    }

    /// Opens a store backed by `path`, loading the snapshot if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read, or
    /// [`StoreError::Snapshot`] if its contents do not decode.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tasks = match tokio::fs::read(&path).await {
            Ok(bytes) => snapshot::decode(&bytes)?
                .tasks
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::info!(path = %path.display(), tasks = tasks.len(), "task store opened");
        Ok(Self {
            tasks: RwLock::new(tasks),
            data_file: Some(path),
        })
    }

    /// Returns the backing data file, if any.
    #[must_use]
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    /// Stores a new task, appending it to the end of its owner's list.
    ///
    /// Whatever `order` the task carries is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot write fails.
    pub async fn create(&self, mut task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        task.order = append_order(last_active_order(&tasks, &task.owner));

        self.persist(&tasks, std::slice::from_ref(&task)).await?;
        tasks.insert(task.id.clone(), task.clone());
        drop(tasks);
        Ok(task)
    }

    /// Returns the owner's task with the given id, whatever its status.
    pub async fn get(&self, owner: &OwnerId, id: &TaskId) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(id).filter(|t| &t.owner == owner).cloned()
    }

    /// Returns the owner's active tasks in manual order.
    pub async fn list_active(&self, owner: &OwnerId) -> Vec<Task> {
        self.list_where(owner, Task::is_active).await
    }

    /// Returns every task of the owner that is not deleted, in manual order.
    /// Completed tasks keep the order they had when they left the list.
    pub async fn list_visible(&self, owner: &OwnerId) -> Vec<Task> {
        self.list_where(owner, |t| t.status != TaskStatus::Deleted).await
    }

    async fn list_where(&self, owner: &OwnerId, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut list: Vec<Task> = tasks
            .values()
            .filter(|t| &t.owner == owner && keep(t))
            .cloned()
            .collect();
        drop(tasks);
        list.sort_by(compare_by_order);
        list
    }

    /// Applies `edit` to the owner's task and stamps `updated_at`.
    ///
    /// The order key is restored after `edit` runs; only reorder and
    /// re-normalization may change it. The one exception is a completed or
    /// deleted task becoming active again: it rejoins at the end of the
    /// owner's list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the owner has no such task, or
    /// an error if the snapshot write fails.
    pub async fn update(
        &self,
        owner: &OwnerId,
        id: &TaskId,
        edit: impl FnOnce(&mut Task),
    ) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let mut task = tasks
            .get(id)
            .filter(|t| &t.owner == owner)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let was_active = task.is_active();
        let order = task.order;
        edit(&mut task);
        task.id = id.clone();
        task.owner = owner.clone();
        task.order = if !was_active && task.is_active() {
            append_order(last_active_order(&tasks, owner))
        } else {
            order
        };
        task.updated_at = now_ms();

        self.persist(&tasks, std::slice::from_ref(&task)).await?;
        tasks.insert(id.clone(), task.clone());
        drop(tasks);
        Ok(task)
    }

    /// Reads the moved task and its intended neighbours under one lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an id the owner does not have,
    /// [`StoreError::Inactive`] for a completed or deleted task, and
    /// [`StoreError::Conflict`] if another active task already sits
    /// between the neighbours.
    pub async fn read_neighbourhood(
        &self,
        owner: &OwnerId,
        target: &TaskId,
        prev: Option<&TaskId>,
        next: Option<&TaskId>,
    ) -> Result<Neighbourhood, StoreError> {
        let tasks = self.tasks.read().await;
        let guard_for = |id: &TaskId| -> Result<OrderGuard, StoreError> {
            let task = tasks
                .get(id)
                .filter(|t| &t.owner == owner)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            if task.is_active() {
                Ok(OrderGuard::of(task))
            } else {
                Err(StoreError::Inactive(id.clone()))
            }
        };
        let hood = Neighbourhood {
            target: guard_for(target)?,
            prev: prev.map(&guard_for).transpose()?,
            next: next.map(&guard_for).transpose()?,
        };
        if let Some(intruder) = hood.intruder(tasks.values(), owner) {
            return Err(StoreError::Conflict(intruder));
        }
        drop(tasks);
        Ok(hood)
    }

    /// Writes `order` to the neighbourhood's target only if the
    /// neighbourhood is exactly as it was read: every guarded task is still
    /// active with the same order, and nothing new sits between the
    /// neighbours.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the target is gone,
    /// [`StoreError::Conflict`] if the neighbourhood changed, or an error
    /// if the snapshot write fails.
    pub async fn write_order_guarded(
        &self,
        owner: &OwnerId,
        order: f64,
        hood: &Neighbourhood,
    ) -> Result<Task, StoreError> {
        let target = &hood.target.task_id;
        let mut tasks = self.tasks.write().await;
        let mut task = tasks
            .get(target)
            .filter(|t| &t.owner == owner)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(target.clone()))?;

        for guard in hood.guards() {
            let holds = tasks.get(&guard.task_id).is_some_and(|t| {
                &t.owner == owner && t.is_active() && t.order.to_bits() == guard.order.to_bits()
            });
            if !holds {
                return Err(StoreError::Conflict(guard.task_id.clone()));
            }
        }
        if let Some(intruder) = hood.intruder(tasks.values(), owner) {
            return Err(StoreError::Conflict(intruder));
        }

        task.order = order;
        task.updated_at = now_ms();
        self.persist(&tasks, std::slice::from_ref(&task)).await?;
        tasks.insert(target.clone(), task.clone());
        drop(tasks);
        Ok(task)
    }

    /// Reassigns evenly spaced orders across the owner's active tasks,
    /// keeping their current sequence. Returns how many tasks were written.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot write fails.
    pub async fn renormalize(&self, owner: &OwnerId, spacing: f64) -> Result<usize, StoreError> {
        let mut tasks = self.tasks.write().await;
        let mut list: Vec<Task> = tasks
            .values()
            .filter(|t| &t.owner == owner && t.is_active())
            .cloned()
            .collect();
        renormalize(&mut list, spacing);
        let now = now_ms();
        for task in &mut list {
            task.updated_at = now;
        }

        self.persist(&tasks, &list).await?;
        let count = list.len();
        for task in list {
            tasks.insert(task.id.clone(), task);
        }
        drop(tasks);
        Ok(count)
    }

    /// Writes the snapshot that results from applying `changed` to `tasks`.
    /// No-op for a memory-only store.
    async fn persist(
        &self,
        tasks: &HashMap<TaskId, Task>,
        changed: &[Task],
    ) -> Result<(), StoreError> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };

        let changed_ids: HashSet<&TaskId> = changed.iter().map(|t| &t.id).collect();
        let mut all: Vec<Task> = tasks
            .values()
            .filter(|t| !changed_ids.contains(&t.id))
            .chain(changed)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        let bytes = snapshot::encode(&StoreSnapshot::new(all))?;

        let tmp = path.with_extension("tmp");
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

/// Highest order among the owner's active tasks.
fn last_active_order(tasks: &HashMap<TaskId, Task>, owner: &OwnerId) -> Option<f64> {
    tasks
        .values()
        .filter(|t| &t.owner == owner && t.is_active())
        .map(|t| t.order)
        .max_by(f64::total_cmp)
}
