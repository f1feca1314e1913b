//! HTTP implementation of [`RemoteTree`].

use std::time::Duration;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};

use crate::config::{RemoteConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;

use super::{ByteStream, CatalogEntry, RemoteTree, normalize_base_url};

/// Listing endpoint, relative to a collection's base address
const LIST_ENDPOINT: &str = "api/ls";

/// Catalog endpoint, relative to the catalog address
const CATALOG_ENDPOINT: &str = "api/collections";

/// [`RemoteTree`] over HTTP with optional proxy, static cookies and retries
///
/// Every request goes through one shared `reqwest::Client`, so proxy,
/// connect timeout and cookies apply to listings, file fetches and the
/// catalog alike. Listings and the catalog are bounded by
/// `request_timeout` as a whole; a file body may take as long as it needs
/// as long as no single wait exceeds `read_timeout`.
#[derive(Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    catalog_url: Option<String>,
    request_timeout: Duration,
    read_timeout: Duration,
    retry: RetryConfig,
}

impl HttpRemote {
    /// Build the HTTP client from the remote settings
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the proxy address or a cookie is invalid.
    pub fn new(remote: &RemoteConfig, retry: RetryConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie_header(remote)? {
            headers.insert(COOKIE, cookie);
        }

        let mut builder = reqwest::Client::builder()
            .connect_timeout(remote.connect_timeout)
            .user_agent(remote.user_agent.clone())
            .default_headers(headers);

        if let Some(proxy) = &remote.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| Error::Config {
                message: format!("invalid proxy '{}': {}", proxy, e),
                key: Some("proxy".to_string()),
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            catalog_url: remote.catalog_url.clone(),
            request_timeout: remote.request_timeout,
            read_timeout: remote.read_timeout,
            retry,
        })
    }

    async fn send_checked(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!(
                "HTTP {} from {}",
                status,
                response.url()
            )));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl RemoteTree for HttpRemote {
    async fn list_directory(&self, base_url: &str, path: &str) -> Result<Bytes> {
        let endpoint = endpoint(base_url, LIST_ENDPOINT)?;
        tracing::debug!(endpoint = %endpoint, path, "Listing remote directory");

        let body = serde_json::json!({ "path": path });
        let (endpoint, body) = (endpoint.as_str(), &body);
        with_retry(&self.retry, || async move {
            let request = self
                .client
                .post(endpoint)
                .timeout(self.request_timeout)
                .json(body);
            let response = self.send_checked(request).await?;
            Ok::<_, Error>(response.bytes().await?)
        })
        .await
    }

    async fn fetch_file(&self, base_url: &str, path: &str) -> Result<ByteStream> {
        let url = file_url(base_url, path)?;
        tracing::debug!(url = %url, "Fetching remote file");

        let (url, read_timeout) = (url.as_str(), self.read_timeout);
        let response = with_retry(&self.retry, || async move {
            match tokio::time::timeout(read_timeout, self.send_checked(self.client.get(url))).await
            {
                Ok(result) => result,
                Err(_) => Err(Error::RemoteUnavailable(format!(
                    "no response from {} within {:?}",
                    url, read_timeout
                ))),
            }
        })
        .await?;

        let body = response.bytes_stream().map_err(Error::from).boxed();
        Ok(with_idle_timeout(body, read_timeout))
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let catalog_url = self.catalog_url.as_deref().ok_or_else(|| Error::Config {
            message: "no catalog address configured".to_string(),
            key: Some("catalog_url".to_string()),
        })?;
        let endpoint = endpoint(catalog_url, CATALOG_ENDPOINT)?;
        let endpoint = endpoint.as_str();

        let body = with_retry(&self.retry, || async move {
            let request = self.client.get(endpoint).timeout(self.request_timeout);
            let response = self.send_checked(request).await?;
            Ok::<_, Error>(response.bytes().await?)
        })
        .await?;

        Ok(serde_json::from_slice(&body)?)
    }
}

/// End `stream` with [`Error::RemoteUnavailable`] once no chunk arrives for `idle`
fn with_idle_timeout(stream: ByteStream, idle: Duration) -> ByteStream {
    futures::stream::unfold(Some(stream), move |state| async move {
        let Some(mut stream) = state else {
            return None;
        };
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(stream))),
            Ok(Some(Err(e))) => Some((Err(e), None)),
            Ok(None) => None,
            Err(_) => Some((
                Err(Error::RemoteUnavailable(format!(
                    "no data received for {:?}",
                    idle
                ))),
                None,
            )),
        }
    })
    .boxed()
}

/// `Cookie` header built from the configured name/value pairs, sorted by name
fn cookie_header(remote: &RemoteConfig) -> Result<Option<HeaderValue>> {
    if remote.cookies.is_empty() {
        return Ok(None);
    }

    let mut pairs: Vec<_> = remote.cookies.iter().collect();
    pairs.sort();
    let value = pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");

    HeaderValue::from_str(&value)
        .map(Some)
        .map_err(|e| Error::Config {
            message: format!("invalid cookie value: {}", e),
            key: Some("cookies".to_string()),
        })
}

fn endpoint(base_url: &str, relative: &str) -> Result<String> {
    let base = normalize_base_url(base_url)?;
    Ok(format!("{}/{}", base.as_str().trim_end_matches('/'), relative))
}

/// Address of a remote file: each path segment percent-encoded on its own
fn file_url(base_url: &str, path: &str) -> Result<String> {
    let encoded = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    endpoint(base_url, &encoded)
}
