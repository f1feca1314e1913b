//! # collection-mirror
//!
//! Library for enumerating and mirroring remote collection trees that are
//! only reachable one directory listing at a time.
//!
//! ## Design Philosophy
//!
//! collection-mirror is designed to be:
//! - **Resumable** - Every bulk download is a task; completed files are recorded
//!   one by one, so an interrupted task picks up where it stopped
//! - **Failure-isolated** - One unreachable file never aborts the rest of a task
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use collection_mirror::{CollectionMirror, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.remote.catalog_url = Some("http://catalog.example".to_string());
//!     config.remote.proxy = Some("socks5h://127.0.0.1:9050".to_string());
//!
//!     let mirror = CollectionMirror::new(config).await?;
//!     mirror.sync_catalog().await?;
//!
//!     // Subscribe to events
//!     let mut events = mirror.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let collection = mirror.find_collection("Archive").await?;
//!     let report = mirror.download_tree(&collection, "/").await?;
//!     if report.failed > 0 {
//!         if let Some(task_id) = &report.task_id {
//!             mirror.resume_task(task_id).await?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Depth-first tree enumeration
pub mod enumerate;
/// Error types
pub mod error;
/// Directory listing decoder
pub mod listing;
/// Enumeration, task registration and resumable downloads
pub mod mirror;
/// Remote path to local path mapping
pub mod paths;
/// Remote collection service access
pub mod remote;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, PersistenceConfig, RemoteConfig, RetryConfig};
pub use db::{Collection, Database, DownloadEntry, NewCollection, TaskSummary};
pub use enumerate::{DirectoryLister, Enumeration};
pub use error::{DatabaseError, Error, Result};
pub use mirror::CollectionMirror;
pub use remote::{CatalogEntry, HttpRemote, RemoteCursor, RemoteTree};
pub use types::{CollectionId, DirectoryEntry, DownloadReport, EntryId, Event, TaskId};

/// Run `work` until it finishes or a termination signal arrives.
///
/// On a signal the mirror is shut down, which stops `work` at the next
/// directory or file boundary; `work` is still awaited so its report
/// reflects what was completed.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use collection_mirror::{CollectionMirror, Config, TaskId, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mirror = CollectionMirror::new(Config::default()).await?;
///     let task_id = TaskId::from("aB3dE5gH7jK9mN1pQ3sT5vX7");
///
///     let report = run_with_shutdown(&mirror, mirror.resume_task(&task_id)).await?;
///     println!("{} still pending", report.failed);
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown<F, T>(mirror: &CollectionMirror, work: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    tokio::pin!(work);

    tokio::select! {
        result = &mut work => result,
        _ = wait_for_signal() => {
            mirror.shutdown();
            work.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal handlers may fail to register in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
