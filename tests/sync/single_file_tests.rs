// Syncs where one side names exactly one file

use crate::common::*;
use s3sync::{MemoryStore, SyncConfig};
use std::sync::Arc;

#[tokio::test]
async fn test_single_object_into_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "backups/db.dump", b"dump".to_vec(), at(100));

    let dest = format!("{}/restore/", root(dir.path()));
    let (manager, _) = new_manager(&store, SyncConfig::default());
    manager.sync("s3://bucket/backups/db.dump", &dest).await.unwrap();

    let target = dir.path().join("restore/db.dump");
    assert_eq!(std::fs::read(&target).unwrap(), b"dump");
    assert_eq!(mtime(&target), at(100));
}

#[tokio::test]
async fn test_single_object_to_exact_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "backups/db.dump", b"dump".to_vec(), at(100));
    // Shares the string prefix but is a different object
    store.put_object(BUCKET, "backups/db.dump.old", b"old".to_vec(), at(100));

    let target = dir.path().join("renamed.bin");
    let (manager, logger) = new_manager(&store, SyncConfig::default());
    manager.sync("s3://bucket/backups/db.dump", &root(&target)).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"dump");
    assert_eq!(
        logger.lines(),
        vec![format!("Downloading db.dump to {}", target.display())]
    );

    // The exact target is paired with the object despite the different name
    manager.sync("s3://bucket/backups/db.dump", &root(&target)).await.unwrap();
    assert_eq!(logger.lines().len(), 1);
}

#[tokio::test]
async fn test_single_file_upload_to_exact_key() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.csv");
    write_local(&source, b"a,b\n1,2\n", 100);
    let store = Arc::new(MemoryStore::new());

    let (manager, logger) = new_manager(&store, SyncConfig::default().with_delete(true));
    manager.sync(&root(&source), "s3://bucket/reports/latest.csv").await.unwrap();

    assert_eq!(store.keys(BUCKET), vec!["reports/latest.csv"]);
    assert_eq!(
        logger.lines(),
        vec!["Uploading report.csv to s3://bucket/reports/latest.csv"]
    );

    manager.sync(&root(&source), "s3://bucket/reports/latest.csv").await.unwrap();
    assert_eq!(logger.lines().len(), 1);
    assert_eq!(store.keys(BUCKET), vec!["reports/latest.csv"]);
}

#[tokio::test]
async fn test_single_file_upload_into_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.csv");
    write_local(&source, b"a,b\n", 100);
    let store = Arc::new(MemoryStore::new());

    let (manager, _) = new_manager(&store, SyncConfig::default());
    manager.sync(&root(&source), "s3://bucket/reports/").await.unwrap();
    manager.sync(&root(&source), "s3://bucket").await.unwrap();

    assert_eq!(store.keys(BUCKET), vec!["report.csv", "reports/report.csv"]);
}
