//! Error types for collection-mirror
//!
//! This module provides the error taxonomy for the library:
//! - Listing decode failures ([`Error::MalformedListing`])
//! - Transport failures ([`Error::RemoteUnavailable`])
//! - Store lookups and constraint failures ([`Error::NotFound`], [`Error::DuplicateCollection`])
//! - Local path safety ([`Error::PathTraversal`])
//! - Machine-readable error codes via [`Error::error_code`]

use thiserror::Error;

/// Result type alias for collection-mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for collection-mirror
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// A directory listing response could not be decoded
    #[error("malformed listing: record {index}: {reason}")]
    MalformedListing {
        /// Zero-based index of the record that failed to parse
        index: usize,
        /// Parser message
        reason: String,
    },

    /// The listing, fetch or catalog call failed at the transport level
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Referenced collection or task does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A collection with this name already exists
    #[error("duplicate collection: {0}")]
    DuplicateCollection(String),

    /// A remote path resolves outside the download root
    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::MalformedListing { .. } => "malformed_listing",
            Error::RemoteUnavailable(_) => "remote_unavailable",
            Error::NotFound(_) => "not_found",
            Error::DuplicateCollection(_) => "duplicate_collection",
            Error::PathTraversal(_) => "path_traversal",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let msg = if e.is_timeout() {
            format!("request timed out: {}", e)
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else if let Some(status) = e.status() {
            format!("HTTP {}: {}", status, e)
        } else {
            e.to_string()
        };
        Error::RemoteUnavailable(msg)
    }
}
