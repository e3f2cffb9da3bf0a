//! JSON request and response bodies of the HTTP API.
//!
//! Field names are camelCase on the wire to stay compatible with the
//! existing web client.

use serde::{Deserialize, Deserializer, Serialize};

use crate::task::{Priority, TaskStatus};

/// Body of `PUT /api/tasks/reorder`.
///
/// At least one neighbour must be present. Ids are kept as raw strings so
/// that an unparsable id surfaces as "not found" rather than a body
/// rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    /// Task being moved.
    pub task_id: String,
    /// Task that will sit immediately before the moved task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_task_id: Option<String>,
    /// Task that will sit immediately after the moved task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_task_id: Option<String>,
}

/// Successful reorder acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderResponse {
    pub message: String,
    /// The order value persisted for the moved task.
    pub order: f64,
    /// Whether the owner's whole list was re-spaced to make room; other
    /// tasks' orders changed too.
    #[serde(default)]
    pub renormalized: bool,
}

/// Result of a re-normalization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenormalizeResponse {
    pub message: String,
    /// Number of tasks whose order was rewritten.
    pub renormalized: usize,
}

/// Generic confirmation body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub focus: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<u64>,
}

impl CreateTaskRequest {
    /// A request carrying only a title, everything else defaulted.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Body of `PATCH /api/tasks/{id}`. Absent fields are left untouched;
/// the order key is not patchable here.
///
/// `description`, `groupId` and `dueDate` are optional on the task, so an
/// explicit `null` clears them: `Some(None)` means clear, `None` means keep.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_id: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<u64>>,
}

/// Reads a present field, `null` included, as `Some`; an absent field
/// falls back to `None` through `#[serde(default)]`.
#[allow(clippy::option_option)]
fn clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
