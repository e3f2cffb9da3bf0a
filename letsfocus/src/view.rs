//! View preferences: how a task list is filtered and sorted for display.
//!
//! [`ViewPreferences`] is a plain value passed to whatever renders the
//! list. Where it comes from is up to a [`PreferenceStore`], so tests use
//! [`MemoryPreferenceStore`] and the CLI uses [`FilePreferenceStore`].

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use letsfocus_proto::order::compare_by_order;
use letsfocus_proto::task::{Priority, Task, TaskStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Errors raised while loading or saving preferences.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    /// Reading or writing the preferences file failed.
    #[error("preferences file {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The preferences file is not valid TOML for [`ViewPreferences`].
    #[error("failed to parse preferences: {0}")]
    Parse(#[from] toml::de::Error),

    /// The preferences could not be encoded.
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Field a view is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// The owner's drag-and-drop order.
    #[default]
    Manual,
    /// Due date; tasks without one sort last.
    DueDate,
    /// Priority, low to high.
    Priority,
    CreatedAt,
    /// Title, case-insensitive.
    Title,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "due_date" | "due" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            "created_at" | "created" => Ok(Self::CreatedAt),
            "title" => Ok(Self::Title),
            other => Err(format!(
                "unknown sort key {other:?} (expected manual, due_date, priority, created_at, title)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Which statuses a view shows. Deleted tasks are never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// To-do and in-progress tasks.
    #[default]
    Active,
    /// Everything except deleted tasks.
    All,
    Todo,
    InProgress,
    Completed,
}

impl StatusFilter {
    const fn accepts(self, status: TaskStatus) -> bool {
        match (self, status) {
            (_, TaskStatus::Deleted) => false,
            (Self::All, _)
            | (Self::Active, TaskStatus::Todo | TaskStatus::InProgress)
            | (Self::Todo, TaskStatus::Todo)
            | (Self::InProgress, TaskStatus::InProgress)
            | (Self::Completed, TaskStatus::Completed) => true,
            _ => false,
        }
    }
}

/// Filter and sort settings for displaying a task list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPreferences {
    pub sort: SortKey,
    pub direction: SortDirection,
    pub status: StatusFilter,
    /// Only tasks with exactly this priority.
    pub priority: Option<Priority>,
    /// Only tasks carrying this tag.
    pub tag: Option<String>,
    /// Only tasks in this group.
    pub group_id: Option<String>,
    /// Only tasks pinned to the focus view.
    pub focus_only: bool,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
}

impl ViewPreferences {
    /// Returns the tasks this view shows, in display order.
    #[must_use]
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let needle = self
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());

        let mut shown: Vec<&Task> = tasks
            .iter()
            .filter(|t| self.status.accepts(t.status))
            .filter(|t| self.priority.is_none_or(|p| t.priority == p))
            .filter(|t| self.tag.as_ref().is_none_or(|tag| t.tags.contains(tag)))
            .filter(|t| {
                self.group_id
                    .as_ref()
                    .is_none_or(|g| t.group_id.as_ref() == Some(g))
            })
            .filter(|t| !self.focus_only || t.focus)
            .filter(|t| needle.as_deref().is_none_or(|n| matches_search(t, n)))
            .collect();

        shown.sort_by(|a, b| {
            let primary = match self.direction {
                SortDirection::Ascending => self.compare(a, b),
                SortDirection::Descending => self.compare(b, a),
            };
            primary.then_with(|| compare_by_order(a, b))
        });
        shown
    }

    /// `true` when the view shows the full active list in manual order,
    /// so that a position on screen is a position in the owner's list.
    #[must_use]
    pub fn allows_manual_reorder(&self) -> bool {
        self.sort == SortKey::Manual
            && self.direction == SortDirection::Ascending
            && self.status == StatusFilter::Active
            && self.priority.is_none()
            && self.tag.is_none()
            && self.group_id.is_none()
            && !self.focus_only
            && self.search.as_deref().is_none_or(str::is_empty)
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self.sort {
            SortKey::Manual => compare_by_order(a, b),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => a.priority.cmp(&b.priority),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
    }
}

fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

/// Where view preferences are kept between runs.
pub trait PreferenceStore: Send + Sync {
    /// Loads the saved preferences, or defaults if none were saved.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError`] if saved preferences exist but cannot be
    /// read.
    fn load(&self) -> Result<ViewPreferences, PreferenceError>;

    /// Saves `prefs`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the preferences cannot be written.
    fn save(&self, prefs: &ViewPreferences) -> Result<(), PreferenceError>;
}

/// Keeps preferences for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    prefs: Mutex<ViewPreferences>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new(prefs: ViewPreferences) -> Self {
        Self {
            prefs: Mutex::new(prefs),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<ViewPreferences, PreferenceError> {
        Ok(self.prefs.lock().clone())
    }

    fn save(&self, prefs: &ViewPreferences) -> Result<(), PreferenceError> {
        *self.prefs.lock() = prefs.clone();
        Ok(())
    }
}

/// Stores preferences as a TOML file.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PreferenceError {
        PreferenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<ViewPreferences, PreferenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ViewPreferences::default()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, prefs: &ViewPreferences) -> Result<(), PreferenceError> {
        let contents = toml::to_string(prefs)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, contents).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "view preferences saved");
        Ok(())
    }
}
