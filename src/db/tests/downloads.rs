use std::collections::HashSet;

use super::{insert_collection, open_temp_db, paths};
use crate::Error;
use crate::types::{CollectionId, EntryId, TASK_ID_LEN, TaskId};

#[tokio::test]
async fn test_create_task_then_pending_returns_all_paths() {
    let (db, _temp_file) = open_temp_db().await;
    let collection_id = insert_collection(&db, "Acme").await;

    let files = paths(&["a/x.bin", "a/y.bin", "b/z.txt"]);
    let task_id = db.create_download_task(collection_id, &files).await.unwrap();
    assert_eq!(task_id.as_str().len(), TASK_ID_LEN);

    let pending = db.pending_entries(&task_id).await.unwrap();
    assert_eq!(pending.len(), 3);
    assert_eq!(
        pending.iter().map(|e| e.remote_path.clone()).collect::<Vec<_>>(),
        files
    );
    for entry in &pending {
        assert!(!entry.downloaded);
        assert_eq!(entry.task_id, task_id);
        assert_eq!(entry.collection_id, collection_id);
        assert!(entry.downloaded_at.is_none());
    }

    db.close().await;
}

#[tokio::test]
async fn test_mark_downloaded_removes_from_pending_and_is_idempotent() {
    let (db, _temp_file) = open_temp_db().await;
    let collection_id = insert_collection(&db, "Acme").await;

    let task_id = db
        .create_download_task(collection_id, &paths(&["one", "two"]))
        .await
        .unwrap();
    let pending = db.pending_entries(&task_id).await.unwrap();
    let first = pending[0].id;

    db.mark_downloaded(first).await.unwrap();
    let after = db.pending_entries(&task_id).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].remote_path, "two");

    let marked_at = db.task_entries(&task_id).await.unwrap()[0].downloaded_at;
    assert!(marked_at.is_some());

    // Second mark is a no-op, not an error, and keeps the first completion time
    db.mark_downloaded(first).await.unwrap();
    let entries = db.task_entries(&task_id).await.unwrap();
    assert!(entries[0].downloaded);
    assert_eq!(entries[0].downloaded_at, marked_at);
    assert_eq!(db.pending_entries(&task_id).await.unwrap().len(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_mark_unknown_entry_is_not_found() {
    let (db, _temp_file) = open_temp_db().await;

    let err = db.mark_downloaded(EntryId(999)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    db.close().await;
}

#[tokio::test]
async fn test_task_for_unknown_collection_inserts_nothing() {
    let (db, _temp_file) = open_temp_db().await;

    let err = db
        .create_download_task(CollectionId(77), &paths(&["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(db.list_tasks().await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_tasks_are_isolated_from_each_other() {
    let (db, _temp_file) = open_temp_db().await;
    let collection_id = insert_collection(&db, "Acme").await;

    let first = db
        .create_download_task(collection_id, &paths(&["same/path"]))
        .await
        .unwrap();
    let second = db
        .create_download_task(collection_id, &paths(&["same/path", "other"]))
        .await
        .unwrap();
    assert_ne!(first, second);

    let entry = db.pending_entries(&first).await.unwrap()[0].id;
    db.mark_downloaded(entry).await.unwrap();

    assert!(db.pending_entries(&first).await.unwrap().is_empty());
    assert_eq!(db.pending_entries(&second).await.unwrap().len(), 2);

    db.close().await;
}

#[tokio::test]
async fn test_large_task_spans_multiple_insert_batches() {
    let (db, _temp_file) = open_temp_db().await;
    let collection_id = insert_collection(&db, "Acme").await;

    let files: Vec<String> = (0..1000).map(|i| format!("dir/file-{i:04}.dat")).collect();
    let task_id = db.create_download_task(collection_id, &files).await.unwrap();

    let pending = db.pending_entries(&task_id).await.unwrap();
    assert_eq!(pending.len(), 1000);
    assert_eq!(pending[0].remote_path, "dir/file-0000.dat");
    assert_eq!(pending[999].remote_path, "dir/file-0999.dat");

    let unique: HashSet<_> = pending.iter().map(|e| e.id).collect();
    assert_eq!(unique.len(), 1000);

    db.close().await;
}

#[tokio::test]
async fn test_task_summary_counts_progress() {
    let (db, _temp_file) = open_temp_db().await;
    let collection_id = insert_collection(&db, "Acme").await;

    let task_id = db
        .create_download_task(collection_id, &paths(&["a", "b", "c"]))
        .await
        .unwrap();
    let pending = db.pending_entries(&task_id).await.unwrap();
    db.mark_downloaded(pending[1].id).await.unwrap();

    let summary = db.task_summary(&task_id).await.unwrap();
    assert_eq!(summary.task_id, task_id);
    assert_eq!(summary.collection_id, collection_id);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.pending(), 2);
    assert!(!summary.is_complete());

    db.close().await;
}

#[tokio::test]
async fn test_unknown_task_summary_is_not_found() {
    let (db, _temp_file) = open_temp_db().await;

    let missing = TaskId::from("doesnotexist");
    assert!(!db.task_exists(&missing).await.unwrap());
    assert!(matches!(
        db.task_summary(&missing).await,
        Err(Error::NotFound(_))
    ));
    assert!(db.pending_entries(&missing).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_list_tasks_returns_every_task() {
    let (db, _temp_file) = open_temp_db().await;
    let collection_id = insert_collection(&db, "Acme").await;

    let first = db
        .create_download_task(collection_id, &paths(&["a"]))
        .await
        .unwrap();
    let second = db
        .create_download_task(collection_id, &paths(&["b", "c"]))
        .await
        .unwrap();

    let tasks = db.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 2);
    // Same second: newest row id breaks the tie
    assert_eq!(tasks[0].task_id, second);
    assert_eq!(tasks[0].total, 2);
    assert_eq!(tasks[1].task_id, first);
    assert!(db.task_exists(&first).await.unwrap());

    db.close().await;
}
