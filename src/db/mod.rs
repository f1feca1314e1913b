//! Database layer for collection-mirror
//!
//! Handles SQLite persistence for collections and the download queue.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`collections`] - Collection catalog CRUD
//! - [`downloads`] - Download tasks, per-file entries, resumption queries
//!
//! Every statement binds its values; identifiers such as collection names
//! and task ids never become part of query text.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

use crate::types::{CollectionId, EntryId, TaskId};

mod collections;
mod downloads;
mod migrations;

/// New collection to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewCollection {
    /// Unique collection name
    pub name: String,
    /// Base address of the collection's remote service
    pub url: String,
    /// Advertised size in bytes
    pub size: i64,
    /// Original publication time
    pub timestamp: DateTime<Utc>,
}

/// Collection record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Collection {
    /// Unique database ID
    pub id: CollectionId,
    /// Unique collection name
    pub name: String,
    /// Base address of the collection's remote service
    pub url: String,
    /// Advertised size in bytes
    pub size: i64,
    /// Publication time as a Unix timestamp (seconds)
    pub ts: i64,
}

impl Collection {
    /// Publication time
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.ts, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// One queued file of a download task
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DownloadEntry {
    /// Unique database ID
    pub id: EntryId,
    /// Collection the file belongs to
    pub collection_id: CollectionId,
    /// Task grouping this entry
    pub task_id: TaskId,
    /// Remote path as produced by enumeration
    pub remote_path: String,
    /// Whether the file has been fetched and written (never reverts)
    pub downloaded: bool,
    /// Unix timestamp when the entry was registered
    pub created_at: i64,
    /// Unix timestamp when the entry was marked downloaded
    pub downloaded_at: Option<i64>,
}

/// Aggregate progress of one task
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TaskSummary {
    /// Task identifier
    pub task_id: TaskId,
    /// Collection the task downloads from
    pub collection_id: CollectionId,
    /// Number of entries registered
    pub total: i64,
    /// Entries already downloaded
    pub downloaded: i64,
    /// Unix timestamp when the task was registered
    pub created_at: i64,
}

impl TaskSummary {
    /// Entries still waiting to be downloaded
    pub fn pending(&self) -> i64 {
        self.total - self.downloaded
    }

    /// Whether every entry has been downloaded
    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }
}

/// Database handle for collection-mirror
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
