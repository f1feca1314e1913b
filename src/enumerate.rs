//! Depth-first enumeration of a remote tree into a flat file list.
//!
//! The remote only answers "what is in this one directory", so the walk keeps
//! its own stack of pending work. Listing a directory pushes its entries in
//! reverse, which makes the pop order, and therefore the output, identical to
//! a recursive depth-first traversal in listing order.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::db::Collection;
use crate::error::Result;
use crate::types::{DirectoryEntry, Event};

/// Source of directory listings for one collection
#[async_trait::async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Decoded entries of `path` inside `collection`
    async fn list(&self, collection: &Collection, path: &str) -> Result<Vec<DirectoryEntry>>;
}

/// Result of one enumeration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// File paths in depth-first listing order; directories never appear here
    pub files: Vec<String>,
    /// Number of listing calls made
    pub directories_listed: usize,
    /// Whether the walk stopped early; `files` is then a prefix of the full result
    pub cancelled: bool,
}

enum Pending {
    Directory(String),
    File(String),
}

/// Walk the tree below `root` and collect every file path
///
/// Each directory is listed exactly once. Entry paths are used verbatim both
/// as the next path to list and as the reported file path. The cancellation
/// token is checked before every listing call.
///
/// # Errors
/// The first listing failure aborts the walk and is returned unchanged.
pub async fn enumerate(
    lister: &dyn DirectoryLister,
    collection: &Collection,
    root: &str,
    cancel: &CancellationToken,
) -> Result<Enumeration> {
    walk(lister, collection, root, cancel, None).await
}

/// [`enumerate`], emitting [`Event::DirectoryListed`] after every listing
pub async fn enumerate_with_events(
    lister: &dyn DirectoryLister,
    collection: &Collection,
    root: &str,
    cancel: &CancellationToken,
    event_tx: &broadcast::Sender<Event>,
) -> Result<Enumeration> {
    walk(lister, collection, root, cancel, Some(event_tx)).await
}

async fn walk(
    lister: &dyn DirectoryLister,
    collection: &Collection,
    root: &str,
    cancel: &CancellationToken,
    event_tx: Option<&broadcast::Sender<Event>>,
) -> Result<Enumeration> {
    let mut result = Enumeration::default();
    let mut stack = vec![Pending::Directory(root.to_string())];

    while let Some(item) = stack.pop() {
        match item {
            Pending::File(path) => result.files.push(path),
            Pending::Directory(path) => {
                if cancel.is_cancelled() {
                    tracing::info!(
                        collection = %collection.name,
                        files_found = result.files.len(),
                        "Enumeration cancelled"
                    );
                    result.cancelled = true;
                    break;
                }

                let entries = lister.list(collection, &path).await?;
                result.directories_listed += 1;

                tracing::debug!(
                    collection = %collection.name,
                    path = %path,
                    entries = entries.len(),
                    "Listed remote directory"
                );

                stack.extend(entries.into_iter().rev().map(|entry| {
                    if entry.is_directory {
                        Pending::Directory(entry.path)
                    } else {
                        Pending::File(entry.path)
                    }
                }));

                if let Some(tx) = event_tx {
                    tx.send(Event::DirectoryListed {
                        collection: collection.name.clone(),
                        path,
                        directories_listed: result.directories_listed,
                        files_found: result.files.len(),
                    })
                    .ok();
                }
            }
        }
    }

    Ok(result)
}
