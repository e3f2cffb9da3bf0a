//! Task model shared by the server and the client.
//!
//! A [`Task`] belongs to exactly one owner. The owner's active tasks
//! (neither completed nor deleted) form the manually ordered list whose
//! sequence is given by the floating-point [`Task::order`] field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a task id from its wire (hyphenated UUID) form.
    ///
    /// Returns `None` for anything that is not a UUID; callers treat that
    /// the same as an id that does not resolve.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user owning a task. Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wraps an owner identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Done. Completed tasks leave the ordered list.
    Completed,
    /// Soft-deleted.
    Deleted,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Task priority. Variants are declared low to high so the derived
/// `Ord` sorts by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Owner of the task; all ordering is scoped to this owner.
    pub owner: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Whether the task is pinned to the focus view.
    pub focus: bool,
    pub tags: Vec<String>,
    /// Opaque group reference; groups themselves live elsewhere.
    pub group_id: Option<String>,
    /// Due date in milliseconds since epoch.
    pub due_date: Option<u64>,
    /// Position key within the owner's manual ordering (ascending).
    pub order: f64,
    /// Milliseconds since epoch.
    pub created_at: u64,
    /// Milliseconds since epoch.
    pub updated_at: u64,
}

impl Task {
    /// Returns `true` if the task takes part in the owner's ordered list.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.status, TaskStatus::Completed | TaskStatus::Deleted)
    }
}

/// Validates a task title.
///
/// # Errors
///
/// Returns a human-readable reason if the title is blank or longer than
/// [`MAX_TASK_TITLE_LENGTH`] characters.
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("task title cannot be empty".to_string());
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(format!(
            "task title too long (max {MAX_TASK_TITLE_LENGTH} characters)"
        ));
    }
    Ok(())
}

/// Returns the current timestamp in milliseconds since epoch.
#[must_use]
pub fn now_ms() -> u64 {
    u64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}
