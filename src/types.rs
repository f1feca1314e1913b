//! Core types for collection-mirror

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Length of generated task identifiers
pub const TASK_ID_LEN: usize = 24;

/// Unique identifier for a collection
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct CollectionId(pub i64);

impl From<i64> for CollectionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one queued file
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct EntryId(pub i64);

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier grouping the entries of one bulk download
///
/// Generated randomly when a task is registered; callers keep it to resume
/// the task later.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh random alphanumeric identifier
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TASK_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of a remote directory listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Path as reported by the remote, used verbatim for further listing and fetching
    pub path: String,
    /// Whether this entry is a directory
    pub is_directory: bool,
    /// Size in bytes (meaningful for files only)
    pub size: u64,
}

/// Outcome of one pass over a task's pending entries
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Task processed (None when enumeration found nothing to register)
    pub task_id: Option<TaskId>,
    /// Entries attempted in this pass
    pub total: usize,
    /// Entries fetched, written and marked downloaded
    pub succeeded: usize,
    /// Entries still pending after the pass
    pub failed: usize,
    /// Whether the pass stopped early because of cancellation
    pub cancelled: bool,
}

/// Events emitted while enumerating and downloading
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A directory listing completed during enumeration
    DirectoryListed {
        /// Collection being walked
        collection: String,
        /// Remote path that was listed
        path: String,
        /// Directories listed so far
        directories_listed: usize,
        /// Files found so far
        files_found: usize,
    },

    /// A download task was registered
    TaskCreated {
        /// New task identifier
        task_id: TaskId,
        /// Number of entries registered
        total: usize,
    },

    /// A file was written and marked downloaded
    FileDownloaded {
        /// Owning task
        task_id: TaskId,
        /// Entry that completed
        entry_id: EntryId,
        /// Remote path of the file
        remote_path: String,
        /// Bytes written
        bytes: u64,
    },

    /// A file could not be fetched or written; its entry stays pending
    FileFailed {
        /// Owning task
        task_id: TaskId,
        /// Entry that failed
        entry_id: EntryId,
        /// Remote path of the file
        remote_path: String,
        /// Error description
        error: String,
    },

    /// A pass over a task finished
    TaskFinished {
        /// Final counts for the pass
        report: DownloadReport,
    },
}
