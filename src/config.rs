//! Configuration types for collection-mirror
//!
//! A single [`Config`] value is built by the caller and handed to
//! [`CollectionMirror::new`](crate::CollectionMirror::new). Nothing in the
//! crate reads configuration from process-wide state.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Remote service access (catalog location, proxy, cookies, timeouts)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Address of the catalog service (`/api/collections` is appended).
    /// A bare host name gets an `http://` scheme.
    #[serde(default)]
    pub catalog_url: Option<String>,

    /// Proxy for every request, e.g. `socks5h://127.0.0.1:9050`
    ///
    /// Use the `socks5h` scheme so host names are resolved by the proxy.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Cookies sent with every request (name -> value)
    #[serde(default)]
    pub cookies: HashMap<String, String>,

    /// Time allowed to establish a connection (default: 60 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Whole-request timeout for listings and the catalog (default: 120 seconds)
    ///
    /// File downloads are not bound by it; see [`Self::read_timeout`].
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Longest wait for response headers or the next body chunk of a file
    /// download (default: 120 seconds)
    #[serde(default = "default_read_timeout", with = "duration_serde")]
    pub read_timeout: Duration,

    /// User-Agent header (default: "collection-mirror")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            catalog_url: None,
            proxy: None,
            cookies: HashMap::new(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            read_timeout: default_read_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Download behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory for mirrored files (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum files fetched at the same time within one task (default: 1)
    ///
    /// Anonymizing transports penalize parallel connections, so the default
    /// keeps a single request outstanding.
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./collection-mirror.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Retry configuration for transient transport failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for [`CollectionMirror`](crate::CollectionMirror)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service access
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Transport retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Download root directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Check settings that would otherwise fail late (at the first request or file)
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_files == 0 {
            return Err(Error::Config {
                message: "max_concurrent_files must be at least 1".to_string(),
                key: Some("max_concurrent_files".to_string()),
            });
        }

        if let Some(proxy) = &self.remote.proxy {
            let parsed = url::Url::parse(proxy).map_err(|e| Error::Config {
                message: format!("invalid proxy URL '{}': {}", proxy, e),
                key: Some("proxy".to_string()),
            })?;
            if !matches!(parsed.scheme(), "http" | "https" | "socks5" | "socks5h") {
                return Err(Error::Config {
                    message: format!("unsupported proxy scheme '{}'", parsed.scheme()),
                    key: Some("proxy".to_string()),
                });
            }
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff_multiplier must be >= 1.0".to_string(),
                key: Some("backoff_multiplier".to_string()),
            });
        }

        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("collection-mirror.db")
}

fn default_max_concurrent_files() -> usize {
    1
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_user_agent() -> String {
    "collection-mirror".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
