//! Access to the remote collection service.
//!
//! [`RemoteTree`] is the seam between the mirror and the network: it lists
//! one directory, streams one file, or fetches the collection catalog.
//! [`HttpRemote`] is the production implementation; tests substitute an
//! in-memory tree.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::db::NewCollection;
use crate::error::{Error, Result};

mod cursor;
mod http;

pub use cursor::RemoteCursor;
pub use http::HttpRemote;

/// Body of a fetched file, delivered chunk by chunk
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Capabilities the mirror needs from a remote collection service
#[async_trait::async_trait]
pub trait RemoteTree: Send + Sync {
    /// Raw listing response for `path` under the collection at `base_url`
    ///
    /// The body is returned undecoded; see [`crate::listing::decode`].
    async fn list_directory(&self, base_url: &str, path: &str) -> Result<Bytes>;

    /// Contents of the file at `path` under the collection at `base_url`
    async fn fetch_file(&self, base_url: &str, path: &str) -> Result<ByteStream>;

    /// Top-level catalog of published collections
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>>;
}

/// One published collection as advertised by the catalog endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Collection name
    pub title: String,
    /// Advertised size in bytes
    #[serde(default)]
    pub size: i64,
    /// Base address of the collection's own service
    pub url: String,
    /// Publication time in Unix epoch milliseconds
    pub dt: i64,
}

impl CatalogEntry {
    /// Publication time
    pub fn published(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.dt)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Row to insert for this entry
    pub fn to_new_collection(&self) -> NewCollection {
        NewCollection {
            name: self.title.clone(),
            url: self.url.clone(),
            size: self.size,
            timestamp: self.published(),
        }
    }
}

/// Parse a collection base address, assuming `http://` when no scheme is given
pub(crate) fn normalize_base_url(base_url: &str) -> Result<url::Url> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    url::Url::parse(&with_scheme).map_err(|e| Error::Config {
        message: format!("invalid base url '{}': {}", base_url, e),
        key: Some("url".to_string()),
    })
}
