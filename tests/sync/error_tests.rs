// Failure handling

use crate::common::*;
use s3sync::{MemoryStore, SyncConfig, SyncError};
use std::sync::Arc;

#[tokio::test]
async fn test_destination_listing_error_aborts() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"a", 100);
    let store = Arc::new(MemoryStore::new());
    store.fail_listing(BUCKET);

    let (manager, logger) = new_manager(&store, SyncConfig::default());
    let err = manager.sync(&root(dir.path()), "s3://bucket/p").await.unwrap_err();

    assert!(matches!(err, SyncError::Listing { .. }));
    assert!(logger.lines().is_empty());
    assert!(store.keys(BUCKET).is_empty());
}

#[tokio::test]
async fn test_source_listing_error_is_reported_and_blocks_deletes() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("precious.txt"), b"keep me", 100);
    let store = Arc::new(MemoryStore::new());
    store.fail_listing(BUCKET);

    let (manager, logger) = new_manager(&store, SyncConfig::default().with_delete(true));
    let err = manager.sync("s3://bucket/p", &root(dir.path())).await.unwrap_err();

    match err {
        SyncError::Aggregate(errors) => {
            assert_eq!(errors.errors().len(), 1);
            assert!(matches!(errors.errors()[0], SyncError::Listing { .. }));
        }
        other => panic!("expected aggregate error, got {:?}", other),
    }
    assert!(logger.lines().is_empty());
    assert!(dir.path().join("precious.txt").exists());
}

#[tokio::test]
async fn test_partial_failures_are_aggregated() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
        store.put_object(BUCKET, &format!("p/{}", name), b"data".to_vec(), at(100));
    }
    store.fail_key(BUCKET, "p/b.txt");
    store.fail_key(BUCKET, "p/d.txt");

    let (manager, _) = new_manager(&store, SyncConfig::default().with_parallel(2));
    let err = manager.sync("s3://bucket/p", &root(dir.path())).await.unwrap_err();

    let SyncError::Aggregate(errors) = err else {
        panic!("expected aggregate error");
    };
    assert_eq!(errors.errors().len(), 2);
    assert!(errors
        .errors()
        .iter()
        .all(|e| matches!(e, SyncError::Transfer { action: "download", .. })));
    assert_eq!(errors.to_string().lines().count(), 2);

    // Siblings of the failed jobs still ran
    assert!(dir.path().join("a.txt").is_file());
    assert!(dir.path().join("c.txt").is_file());
    assert_eq!(manager.statistics().files, 2);
}

#[tokio::test]
async fn test_missing_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let (manager, _) = new_manager(&store, SyncConfig::default());
    let err = manager.sync(&root(dir.path()), "s3:///prefix").await.unwrap_err();

    assert!(matches!(err, SyncError::MissingBucket { .. }));
    assert_eq!(err.to_string(), "s3 url is missing bucket name");
}

#[tokio::test]
async fn test_unsupported_directions() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let (manager, _) = new_manager(&store, SyncConfig::default());

    let err = manager.sync("s3://a/x", "s3://b/y").await.unwrap_err();
    assert!(matches!(err, SyncError::UnsupportedDirection(_)));

    let local = root(dir.path());
    let err = manager.sync(&local, &local).await.unwrap_err();
    assert!(matches!(err, SyncError::UnsupportedDirection(_)));
}
