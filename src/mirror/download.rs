//! Task creation, per-file fetch-and-write, and resumption.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::db::{Collection, DownloadEntry};
use crate::error::Result;
use crate::paths;
use crate::types::{DownloadReport, Event, TaskId};

use super::CollectionMirror;

/// Suffix of the temporary file a download is streamed into
const PART_SUFFIX: &str = ".part";

enum Outcome {
    Downloaded,
    Failed,
    Skipped,
}

impl CollectionMirror {
    /// Enumerate `root`, register a task for every file found, and download them
    ///
    /// Returns a report without a task id when nothing was found, or when the
    /// enumeration was cancelled before it finished; no task is registered in
    /// either case. Per-file failures do not abort the pass: they are counted
    /// in [`DownloadReport::failed`] and remain pending for [`Self::resume_task`].
    pub async fn download_tree(&self, collection: &Collection, root: &str) -> Result<DownloadReport> {
        let enumeration = self.enumerate(collection, root).await?;

        if enumeration.cancelled {
            tracing::info!(
                collection = %collection.name,
                root,
                files_found = enumeration.files.len(),
                "Enumeration cancelled, no task registered"
            );
            return Ok(DownloadReport {
                cancelled: true,
                ..Default::default()
            });
        }

        if enumeration.files.is_empty() {
            tracing::info!(collection = %collection.name, root, "No files to download");
            return Ok(DownloadReport::default());
        }

        let task_id = self
            .db
            .create_download_task(collection.id, &enumeration.files)
            .await?;

        self.emit_event(Event::TaskCreated {
            task_id: task_id.clone(),
            total: enumeration.files.len(),
        });

        let pending = self.db.pending_entries(&task_id).await?;
        self.process_entries(collection, &task_id, pending).await
    }

    /// Download the entries of `task_id` that are still pending
    ///
    /// The tree is not enumerated again; only files recorded as not yet
    /// downloaded are fetched. Resuming a completed task fetches nothing.
    ///
    /// # Errors
    /// [`crate::Error::NotFound`] if no task has this id.
    pub async fn resume_task(&self, task_id: &TaskId) -> Result<DownloadReport> {
        let summary = self.db.task_summary(task_id).await?;
        let collection = self.db.get_collection(summary.collection_id).await?;
        let pending = self.db.pending_entries(task_id).await?;

        tracing::info!(
            task_id = %task_id,
            collection = %collection.name,
            pending = pending.len(),
            total = summary.total,
            "Resuming download task"
        );

        self.process_entries(&collection, task_id, pending).await
    }

    /// One pass over `entries`, at most `max_concurrent_files` at a time
    ///
    /// Entries whose remote paths map to the same local file (`a/x`,
    /// `/a/x`, `a//x`) are never in flight together: each repeat waits for
    /// a later round.
    async fn process_entries(
        &self,
        collection: &Collection,
        task_id: &TaskId,
        entries: Vec<DownloadEntry>,
    ) -> Result<DownloadReport> {
        let total = entries.len();
        let limit = self.config.download.max_concurrent_files.max(1);

        let mut outcomes: Vec<Outcome> = Vec::with_capacity(total);
        let mut remaining = entries;
        while !remaining.is_empty() {
            let (round, deferred) =
                split_repeated_targets(self.config.download_dir(), &collection.name, remaining);
            if !deferred.is_empty() {
                tracing::debug!(
                    task_id = %task_id,
                    deferred = deferred.len(),
                    "Entries share a local path, deferring repeats"
                );
            }

            let round_outcomes: Vec<Outcome> = futures::stream::iter(round)
                .map(|entry| self.process_entry(collection, task_id, entry))
                .buffer_unordered(limit)
                .collect()
                .await;
            outcomes.extend(round_outcomes);
            remaining = deferred;
        }

        let succeeded = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Downloaded))
            .count();
        let errored = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Failed))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Skipped))
            .count();

        let report = DownloadReport {
            task_id: Some(task_id.clone()),
            total,
            succeeded,
            failed: total - succeeded,
            cancelled: skipped > 0,
        };

        tracing::info!(
            task_id = %task_id,
            total,
            succeeded,
            errored,
            skipped,
            "Download pass finished"
        );

        self.emit_event(Event::TaskFinished {
            report: report.clone(),
        });

        Ok(report)
    }

    async fn process_entry(
        &self,
        collection: &Collection,
        task_id: &TaskId,
        entry: DownloadEntry,
    ) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Skipped;
        }

        match self.download_entry(collection, &entry).await {
            Ok(bytes) => {
                tracing::debug!(
                    task_id = %task_id,
                    entry_id = entry.id.0,
                    path = %entry.remote_path,
                    bytes,
                    "File downloaded"
                );
                self.emit_event(Event::FileDownloaded {
                    task_id: task_id.clone(),
                    entry_id: entry.id,
                    remote_path: entry.remote_path,
                    bytes,
                });
                Outcome::Downloaded
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %task_id,
                    entry_id = entry.id.0,
                    path = %entry.remote_path,
                    error = %e,
                    "File download failed, entry stays pending"
                );
                self.emit_event(Event::FileFailed {
                    task_id: task_id.clone(),
                    entry_id: entry.id,
                    remote_path: entry.remote_path,
                    error: e.to_string(),
                });
                Outcome::Failed
            }
        }
    }

    /// Fetch, write and mark one entry; returns the number of bytes written
    ///
    /// The entry is only marked downloaded once the file sits at its final
    /// path, so a crash at any point leaves it pending.
    async fn download_entry(&self, collection: &Collection, entry: &DownloadEntry) -> Result<u64> {
        let local = paths::local_path(
            self.config.download_dir(),
            &collection.name,
            &entry.remote_path,
        )?;

        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = part_path(&local);
        let bytes = match self.write_part(collection, entry, &part).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tokio::fs::remove_file(&part).await.ok();
                return Err(e);
            }
        };

        tokio::fs::rename(&part, &local).await?;
        self.db.mark_downloaded(entry.id).await?;

        Ok(bytes)
    }

    async fn write_part(
        &self,
        collection: &Collection,
        entry: &DownloadEntry,
        part: &Path,
    ) -> Result<u64> {
        let mut stream = self
            .remote
            .fetch_file(&collection.url, &entry.remote_path)
            .await?;

        let mut file = tokio::fs::File::create(part).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        Ok(written)
    }
}

/// Split `entries` into those with a first-seen local path and the repeats
///
/// Unmappable paths stay in the first group so they fail in this round.
fn split_repeated_targets(
    root: &Path,
    collection: &str,
    entries: Vec<DownloadEntry>,
) -> (Vec<DownloadEntry>, Vec<DownloadEntry>) {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .partition(|entry| match paths::local_path(root, collection, &entry.remote_path) {
            Ok(local) => seen.insert(local),
            Err(_) => true,
        })
}

fn part_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollectionId, EntryId};

    fn entry(id: i64, remote_path: &str) -> DownloadEntry {
        DownloadEntry {
            id: EntryId(id),
            collection_id: CollectionId(1),
            task_id: TaskId::from("task"),
            remote_path: remote_path.to_string(),
            downloaded: false,
            created_at: 0,
            downloaded_at: None,
        }
    }

    #[test]
    fn repeated_targets_wait_for_a_later_round() {
        let entries = vec![
            entry(1, "a/x"),
            entry(2, "/a/x"),
            entry(3, "b"),
            entry(4, "../up"),
            entry(5, "a//x"),
        ];

        let (round, deferred) = split_repeated_targets(Path::new("/m"), "col", entries);

        let ids = |list: &[DownloadEntry]| list.iter().map(|e| e.id.0).collect::<Vec<_>>();
        assert_eq!(ids(&round), vec![1, 3, 4]);
        assert_eq!(ids(&deferred), vec![2, 5]);

        let (round, deferred) = split_repeated_targets(Path::new("/m"), "col", deferred);
        assert_eq!(ids(&round), vec![2]);
        assert_eq!(ids(&deferred), vec![5]);
    }

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/m/COL/a/b.tar.gz")),
            Path::new("/m/COL/a/b.tar.gz.part")
        );
    }
}
