//! Download queue operations: task registration, resumption queries, completion marks.

use crate::error::DatabaseError;
use crate::types::{CollectionId, EntryId, TaskId};
use crate::{Error, Result};

use super::{Database, DownloadEntry, TaskSummary};

/// Columns selected for [`DownloadEntry`] rows
const ENTRY_COLUMNS: &str = "id, collection_id, task_identifier AS task_id, fpath AS remote_path, \
                             downloaded, created_at, downloaded_at";

impl Database {
    /// Register a download task: one pending entry per remote path
    ///
    /// Generates a fresh random task identifier and inserts all entries in a
    /// single transaction, so either every path is queued or none is.
    ///
    /// Automatically chunks the input to stay within SQLite's bind variable limit
    /// (5 variables per entry, chunked to max 199 entries per INSERT).
    pub async fn create_download_task(
        &self,
        collection_id: CollectionId,
        remote_paths: &[String],
    ) -> Result<TaskId> {
        // SQLite default SQLITE_MAX_VARIABLE_NUMBER is 999.
        const MAX_ENTRIES_PER_BATCH: usize = 199;

        if !self.collection_exists(collection_id).await? {
            return Err(Error::NotFound(format!("collection {}", collection_id)));
        }

        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        // Collisions are astronomically unlikely, but a reused id would merge two tasks
        let task_id = loop {
            let candidate = TaskId::generate();
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM downloads WHERE task_identifier = ?)",
            )
            .bind(&candidate)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to check task identifier: {}",
                    e
                )))
            })?;
            if !taken {
                break candidate;
            }
        };

        for chunk in remote_paths.chunks(MAX_ENTRIES_PER_BATCH) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO downloads (collection_id, task_identifier, fpath, downloaded, created_at) ",
            );

            query_builder.push_values(chunk, |mut b, path| {
                b.push_bind(collection_id)
                    .push_bind(&task_id)
                    .push_bind(path)
                    .push_bind(0) // downloaded = false
                    .push_bind(now);
            });

            query_builder.build().execute(&mut *tx).await.map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert download entries: {}",
                    e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit download task: {}",
                e
            )))
        })?;

        tracing::info!(
            task_id = %task_id,
            collection_id = collection_id.0,
            entries = remote_paths.len(),
            "Registered download task"
        );

        Ok(task_id)
    }

    /// Entries of a task that are not downloaded yet, in registration order
    ///
    /// This is the resumption query: after a crash it returns exactly the
    /// files that still need fetching.
    pub async fn pending_entries(&self, task_id: &TaskId) -> Result<Vec<DownloadEntry>> {
        let sql = format!(
            "SELECT {} FROM downloads WHERE task_identifier = ? AND downloaded = 0 ORDER BY id ASC",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, DownloadEntry>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get pending entries: {}",
                    e
                )))
            })?;

        Ok(rows)
    }

    /// All entries of a task, in registration order
    pub async fn task_entries(&self, task_id: &TaskId) -> Result<Vec<DownloadEntry>> {
        let sql = format!(
            "SELECT {} FROM downloads WHERE task_identifier = ? ORDER BY id ASC",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, DownloadEntry>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get task entries: {}",
                    e
                )))
            })?;

        Ok(rows)
    }

    /// Mark an entry as downloaded
    ///
    /// Idempotent: marking an already-downloaded entry is a no-op and keeps
    /// its original completion time. Fails with [`Error::NotFound`] only if
    /// the entry does not exist.
    pub async fn mark_downloaded(&self, entry_id: EntryId) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE downloads
            SET downloaded = 1, downloaded_at = COALESCE(downloaded_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(entry_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark entry downloaded: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("download entry {}", entry_id)));
        }

        Ok(())
    }

    /// Check whether any entry carries this task identifier
    pub async fn task_exists(&self, task_id: &TaskId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM downloads WHERE task_identifier = ?)")
                .bind(task_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to check task: {}",
                        e
                    )))
                })?;

        Ok(exists)
    }

    /// Progress counts for one task
    pub async fn task_summary(&self, task_id: &TaskId) -> Result<TaskSummary> {
        sqlx::query_as::<_, TaskSummary>(
            r#"
            SELECT
                task_identifier AS task_id,
                MIN(collection_id) AS collection_id,
                COUNT(*) AS total,
                SUM(downloaded) AS downloaded,
                MIN(created_at) AS created_at
            FROM downloads
            WHERE task_identifier = ?
            GROUP BY task_identifier
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to summarize task: {}",
                e
            )))
        })?
        .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))
    }

    /// Progress counts for every task, most recently registered first
    pub async fn list_tasks(&self) -> Result<Vec<TaskSummary>> {
        let rows = sqlx::query_as::<_, TaskSummary>(
            r#"
            SELECT
                task_identifier AS task_id,
                MIN(collection_id) AS collection_id,
                COUNT(*) AS total,
                SUM(downloaded) AS downloaded,
                MIN(created_at) AS created_at
            FROM downloads
            GROUP BY task_identifier
            ORDER BY MIN(created_at) DESC, MIN(id) DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
