//! Collection mirror: enumeration, task registration and resumable downloads.
//!
//! The `CollectionMirror` struct and its methods are organized by domain:
//! - [`catalog`] - Collection catalog sync and lookups
//! - [`download`] - Task creation, per-file fetch-and-write, resumption

mod catalog;
mod download;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::{Collection, Database, TaskSummary};
use crate::enumerate::{self, DirectoryLister, Enumeration};
use crate::error::{Error, Result};
use crate::listing;
use crate::remote::{HttpRemote, RemoteTree};
use crate::types::{DirectoryEntry, Event, TaskId};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main mirror instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct CollectionMirror {
    /// Database instance for persistence
    /// Public for integration tests to inspect task state
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Remote collection service
    pub(crate) remote: Arc<dyn RemoteTree>,
    /// Stops enumeration and download loops at the next directory or file boundary
    pub(crate) cancel: CancellationToken,
}

impl CollectionMirror {
    /// Create a mirror talking to the remote over HTTP
    ///
    /// Validates the configuration, creates the download directory, opens
    /// (and migrates) the database and builds the HTTP client.
    pub async fn new(config: Config) -> Result<Self> {
        let remote = HttpRemote::new(&config.remote, config.retry.clone())?;
        Self::with_remote(config, Arc::new(remote)).await
    }

    /// Create a mirror over any [`RemoteTree`] implementation
    pub async fn with_remote(config: Config, remote: Arc<dyn RemoteTree>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Database::new(&config.persistence.database_path).await?;
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            download_dir = %config.download.download_dir.display(),
            database = %config.persistence.database_path.display(),
            max_concurrent_files = config.download.max_concurrent_files,
            "Collection mirror ready"
        );

        Ok(Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            remote,
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to enumeration and download events
    ///
    /// Each subscriber receives every event independently. Slow subscribers
    /// may observe `RecvError::Lagged` once the buffer fills.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Token that stops this mirror's enumeration and download loops
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop in-flight work at the next directory or file boundary
    ///
    /// Entries not yet processed stay pending and can be resumed by task id
    /// from a new mirror instance.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down collection mirror");
        self.cancel.cancel();
    }

    /// Decoded entries of one remote directory
    pub async fn list_directory(
        &self,
        collection: &Collection,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>> {
        self.lister().list(collection, path).await
    }

    /// Enumerate every file below `root` without registering a task
    pub async fn enumerate(&self, collection: &Collection, root: &str) -> Result<Enumeration> {
        enumerate::enumerate_with_events(
            &self.lister(),
            collection,
            root,
            &self.cancel,
            &self.event_tx,
        )
        .await
    }

    /// Progress counts for one task
    pub async fn task_summary(&self, task_id: &TaskId) -> Result<TaskSummary> {
        self.db.task_summary(task_id).await
    }

    /// Progress counts for every task, most recent first
    pub async fn list_tasks(&self) -> Result<Vec<TaskSummary>> {
        self.db.list_tasks().await
    }

    fn lister(&self) -> RemoteLister<'_> {
        RemoteLister {
            remote: self.remote.as_ref(),
        }
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}

/// [`DirectoryLister`] that fetches from the remote and decodes the body
struct RemoteLister<'a> {
    remote: &'a dyn RemoteTree,
}

#[async_trait::async_trait]
impl DirectoryLister for RemoteLister<'_> {
    async fn list(&self, collection: &Collection, path: &str) -> Result<Vec<DirectoryEntry>> {
        let body = self.remote.list_directory(&collection.url, path).await?;
        listing::decode(&body)
    }
}
