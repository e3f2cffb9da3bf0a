//! Binary snapshot format for the task store.
//!
//! The server persists its whole task table as one postcard-encoded
//! [`StoreSnapshot`]. postcard writes `f64` as its raw IEEE bytes, so
//! order keys survive a save/load cycle bit-for-bit.

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Error type for snapshot encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Serialization or deserialization failed.
    #[error("snapshot serialization error: {0}")]
    Serialization(String),
    /// The snapshot was written by an incompatible version.
    #[error("unsupported snapshot version {found} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion {
        /// Version found in the snapshot header.
        found: u32,
    },
}

/// Full contents of the task store at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub tasks: Vec<Task>,
}

impl StoreSnapshot {
    /// Wraps a task table in a snapshot of the current version.
    #[must_use]
    pub const fn new(tasks: Vec<Task>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            tasks,
        }
    }
}

/// Encodes a [`StoreSnapshot`] into bytes using postcard.
///
/// # Errors
///
/// Returns `SnapshotError::Serialization` if the snapshot cannot be serialized.
pub fn encode(snapshot: &StoreSnapshot) -> Result<Vec<u8>, SnapshotError> {
    postcard::to_allocvec(snapshot).map_err(|e| SnapshotError::Serialization(e.to_string()))
}

/// Decodes a [`StoreSnapshot`] from bytes using postcard.
///
/// # Errors
///
/// Returns `SnapshotError::Serialization` for malformed bytes and
/// `SnapshotError::UnsupportedVersion` for a snapshot of another version.
pub fn decode(bytes: &[u8]) -> Result<StoreSnapshot, SnapshotError> {
    let snapshot: StoreSnapshot =
        postcard::from_bytes(bytes).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
        });
    }
    Ok(snapshot)
}
