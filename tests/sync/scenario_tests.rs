// Change detection across repeated syncs

use crate::common::*;
use s3sync::{MemoryStore, SyncConfig};
use std::path::Path;
use std::sync::Arc;

#[tokio::test]
async fn test_size_and_time_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let local = root(dir.path());
    let store = Arc::new(MemoryStore::new());

    // Remote a.txt is older than the local copy with the same size
    store.put_object(BUCKET, "p/a.txt", b"hello".to_vec(), at(50));
    write_local(&dir.path().join("a.txt"), b"hello", 100);

    let (manager, logger) = new_manager(&store, SyncConfig::default());
    manager.sync("s3://bucket/p", &local).await.unwrap();
    assert!(logger.lines().is_empty());

    // A size change always transfers, even though the remote is older
    store.put_object(BUCKET, "p/a.txt", b"abc".to_vec(), at(50));
    let (manager, logger) = new_manager(&store, SyncConfig::default());
    manager.sync("s3://bucket/p", &local).await.unwrap();
    assert_eq!(
        logger.lines(),
        vec![format!("Downloading a.txt to {}", Path::new(&local).join("a.txt").display())]
    );
    assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"abc");

    // Back the other way: the new local file goes up, the remote-only one goes away
    write_local(&dir.path().join("b.txt"), b"bee", 200);
    store.put_object(BUCKET, "p/remote-only.txt", b"x".to_vec(), at(10));

    let (manager, logger) = new_manager(&store, SyncConfig::default().with_delete(true));
    manager.sync(&local, "s3://bucket/p").await.unwrap();
    assert_eq!(
        sorted_lines(&logger),
        vec![
            "Deleting s3://bucket/p/remote-only.txt".to_string(),
            "Uploading b.txt to s3://bucket/p/b.txt".to_string(),
        ]
    );
    assert_eq!(store.keys(BUCKET), vec!["p/a.txt", "p/b.txt"]);
}

#[tokio::test]
async fn test_second_upload_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"one", 100);
    write_local(&dir.path().join("nested/deep/b.txt"), b"two", 100);
    let store = Arc::new(MemoryStore::new());

    let (manager, logger) = new_manager(&store, SyncConfig::default().with_delete(true));
    manager.sync(&root(dir.path()), "s3://bucket/backup").await.unwrap();
    assert_eq!(logger.lines().len(), 2);
    assert_eq!(store.keys(BUCKET), vec!["backup/a.txt", "backup/nested/deep/b.txt"]);

    // Uploaded objects are newer than the local files
    manager.sync(&root(dir.path()), "s3://bucket/backup").await.unwrap();
    assert_eq!(logger.lines().len(), 2);
    assert_eq!(manager.statistics().files, 2);
}

#[tokio::test]
async fn test_second_download_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "data/a.txt", b"one".to_vec(), at(1_000));
    store.put_object(BUCKET, "data/sub/b.txt", b"two".to_vec(), at(2_000));

    let (manager, logger) = new_manager(&store, SyncConfig::default());
    manager.sync("s3://bucket/data", &root(dir.path())).await.unwrap();
    assert_eq!(logger.lines().len(), 2);

    manager.sync("s3://bucket/data/", &root(dir.path())).await.unwrap();
    assert_eq!(logger.lines().len(), 2);
}

#[tokio::test]
async fn test_newer_source_with_same_size_is_transferred() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"old", 100);
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "a.txt", b"new".to_vec(), at(200));

    let (manager, logger) = new_manager(&store, SyncConfig::default());
    manager.sync("s3://bucket", &root(dir.path())).await.unwrap();

    assert_eq!(logger.lines().len(), 1);
    assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"new");
}

#[tokio::test]
async fn test_extraneous_files_kept_without_delete() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"a", 100);
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "p/extra.txt", b"x".to_vec(), at(10));

    let (manager, logger) = new_manager(&store, SyncConfig::default());
    manager.sync(&root(dir.path()), "s3://bucket/p").await.unwrap();

    assert_eq!(logger.lines(), vec!["Uploading a.txt to s3://bucket/p/a.txt"]);
    assert!(store.object(BUCKET, "p/extra.txt").is_some());
    assert_eq!(manager.statistics().deleted_files, 0);
}
