//! Database tests, one file per domain submodule.

mod downloads;

use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;

use super::{Database, NewCollection};
use crate::types::CollectionId;

/// Open a fresh database in a temp file. The file must outlive the database.
pub(super) async fn open_temp_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

pub(super) fn new_collection(name: &str, ts: i64) -> NewCollection {
    NewCollection {
        name: name.to_string(),
        url: format!("http://{}.example", name.to_lowercase()),
        size: 1 << 30,
        timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
    }
}

pub(super) async fn insert_collection(db: &Database, name: &str) -> CollectionId {
    db.create_collection(&new_collection(name, 1_700_000_000))
        .await
        .unwrap()
}

pub(super) fn paths(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
