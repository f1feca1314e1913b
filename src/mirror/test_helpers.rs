//! Shared test helpers: an in-memory remote tree and mirror construction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::{Collection, NewCollection};
use crate::error::{Error, Result};
use crate::mirror::CollectionMirror;
use crate::remote::{ByteStream, CatalogEntry, RemoteTree};
use crate::types::DirectoryEntry;

/// In-memory [`RemoteTree`] serving listings in the remote's padded wire format
#[derive(Default)]
pub(crate) struct FakeRemote {
    listings: Mutex<HashMap<String, Vec<DirectoryEntry>>>,
    raw_listings: Mutex<HashMap<String, Vec<u8>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    truncated: Mutex<HashSet<String>>,
    catalog: Mutex<Vec<CatalogEntry>>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    chunk_delay: Mutex<Option<Duration>>,
    open_streams: Arc<Mutex<HashMap<String, usize>>>,
    max_overlap: Arc<AtomicUsize>,
}

/// Counts a body stream as open on its normalized path until dropped
struct OpenStream {
    open: Arc<Mutex<HashMap<String, usize>>>,
    key: String,
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        if let Some(count) = self.open.lock().unwrap().get_mut(&self.key) {
            *count -= 1;
        }
    }
}

impl FakeRemote {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add_dir(&self, path: &str, entries: Vec<DirectoryEntry>) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), entries);
    }

    pub(crate) fn add_raw_listing(&self, path: &str, body: &[u8]) {
        self.raw_listings
            .lock()
            .unwrap()
            .insert(path.to_string(), body.to_vec());
    }

    pub(crate) fn add_file(&self, path: &str, contents: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_vec());
    }

    /// Make `fetch_file` fail for `path` until [`Self::heal`] is called
    pub(crate) fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    /// Make the body stream for `path` break after its first chunk
    pub(crate) fn truncate(&self, path: &str) {
        self.truncated.lock().unwrap().insert(path.to_string());
    }

    pub(crate) fn heal(&self) {
        self.failing.lock().unwrap().clear();
        self.truncated.lock().unwrap().clear();
    }

    /// Cancel `token` as soon as the `fetches`-th file fetch starts
    pub(crate) fn cancel_after_fetches(&self, fetches: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((fetches, token));
    }

    /// Sleep `delay` before every body chunk
    pub(crate) fn slow_chunks(&self, delay: Duration) {
        *self.chunk_delay.lock().unwrap() = Some(delay);
    }

    /// Most body streams ever open at once for one normalized path
    pub(crate) fn max_overlap(&self) -> usize {
        self.max_overlap.load(Ordering::SeqCst)
    }

    pub(crate) fn set_catalog(&self, entries: Vec<CatalogEntry>) {
        *self.catalog.lock().unwrap() = entries;
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

/// Render entries the way the remote does: junk prefix, records, NUL padding
pub(crate) fn wire_listing(entries: &[DirectoryEntry]) -> Vec<u8> {
    let mut body = vec![0x1f, 0x8b, 0x00];
    for entry in entries {
        // `path` must lead the record; the decoder splits on `{"path`
        let record = format!(
            r#"{{"path":{},"attrs":{{"isDirectory":{},"size":{}}}}}"#,
            serde_json::to_string(&entry.path).unwrap(),
            entry.is_directory,
            entry.size
        );
        body.extend_from_slice(record.as_bytes());
        body.extend_from_slice(&[0, 0, 0xff, 0xfe]);
    }
    body
}

#[async_trait::async_trait]
impl RemoteTree for FakeRemote {
    async fn list_directory(&self, _base_url: &str, path: &str) -> Result<Bytes> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(raw) = self.raw_listings.lock().unwrap().get(path) {
            return Ok(Bytes::from(raw.clone()));
        }

        let listings = self.listings.lock().unwrap();
        let entries = listings.get(path).cloned().unwrap_or_default();
        Ok(Bytes::from(wire_listing(&entries)))
    }

    async fn fetch_file(&self, _base_url: &str, path: &str) -> Result<ByteStream> {
        let fetches = self.fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if fetches >= *after {
                token.cancel();
            }
        }

        if self.failing.lock().unwrap().contains(path) {
            return Err(Error::RemoteUnavailable(format!("HTTP 503 for {}", path)));
        }

        let contents = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::RemoteUnavailable(format!("HTTP 404 for {}", path)))?;

        let mid = contents.len() / 2;
        let head = Bytes::copy_from_slice(&contents[..mid]);
        let tail = Bytes::copy_from_slice(&contents[mid..]);

        let chunks: Vec<Result<Bytes>> = if self.truncated.lock().unwrap().contains(path) {
            vec![
                Ok(head),
                Err(Error::RemoteUnavailable("connection reset".to_string())),
            ]
        } else {
            vec![Ok(head), Ok(tail)]
        };

        let key = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let guard = {
            let mut open = self.open_streams.lock().unwrap();
            let count = open.entry(key.clone()).or_insert(0);
            *count += 1;
            self.max_overlap.fetch_max(*count, Ordering::SeqCst);
            OpenStream {
                open: self.open_streams.clone(),
                key,
            }
        };

        let delay = *self.chunk_delay.lock().unwrap();
        let stream = futures::stream::iter(chunks).then(move |chunk| {
            let _open = &guard;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                chunk
            }
        });
        Ok(stream.boxed())
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.catalog.lock().unwrap().clone())
    }
}

pub(crate) fn file(path: &str, size: u64) -> DirectoryEntry {
    DirectoryEntry {
        path: path.to_string(),
        is_directory: false,
        size,
    }
}

pub(crate) fn dir(path: &str) -> DirectoryEntry {
    DirectoryEntry {
        path: path.to_string(),
        is_directory: true,
        size: 0,
    }
}

/// Configuration rooted in a temporary directory
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = root.join("test.db");
    config.download.download_dir = root.join("downloads");
    config
}

/// Mirror over `remote` with its database and downloads in a fresh temp dir.
/// Returns the mirror and the tempdir (which must be kept alive).
pub(crate) async fn create_test_mirror(
    remote: Arc<FakeRemote>,
) -> (CollectionMirror, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mirror = CollectionMirror::with_remote(test_config(temp_dir.path()), remote)
        .await
        .unwrap();
    (mirror, temp_dir)
}

pub(crate) async fn add_test_collection(mirror: &CollectionMirror, name: &str) -> Collection {
    let id = mirror
        .add_collection(&NewCollection {
            name: name.to_string(),
            url: format!("{}.onion", name),
            size: 0,
            timestamp: chrono::Utc::now(),
        })
        .await
        .unwrap();
    mirror.get_collection(id).await.unwrap()
}
