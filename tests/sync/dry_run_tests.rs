// Dry runs log every decision without touching either side

use crate::common::*;
use s3sync::{MemoryStore, SyncConfig};
use std::sync::Arc;

#[tokio::test]
async fn test_dry_run_upload_matches_real_run() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"new", 100);
    write_local(&dir.path().join("sub/b.txt"), b"bee", 100);
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "p/stale.txt", b"x".to_vec(), at(10));

    let config = SyncConfig::default().with_delete(true);
    let (dry, dry_logger) = new_manager(&store, config.clone().with_dry_run(true));
    dry.sync(&root(dir.path()), "s3://bucket/p").await.unwrap();

    assert_eq!(store.keys(BUCKET), vec!["p/stale.txt"]);
    assert_eq!(dry.statistics().files, 0);
    assert_eq!(dry.statistics().deleted_files, 0);

    let (real, real_logger) = new_manager(&store, config);
    real.sync(&root(dir.path()), "s3://bucket/p").await.unwrap();

    assert_eq!(sorted_lines(&dry_logger), sorted_lines(&real_logger));
    assert_eq!(sorted_lines(&real_logger).len(), 3);
    assert_eq!(store.keys(BUCKET), vec!["p/a.txt", "p/sub/b.txt"]);
}

#[tokio::test]
async fn test_dry_run_download_leaves_disk_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("local-only.txt"), b"mine", 100);
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "p/a.txt", b"remote".to_vec(), at(100));

    let config = SyncConfig::default().with_delete(true).with_dry_run(true);
    let (manager, logger) = new_manager(&store, config);
    manager.sync("s3://bucket/p", &root(dir.path())).await.unwrap();

    assert_eq!(logger.lines().len(), 2);
    assert!(dir.path().join("local-only.txt").exists());
    assert!(!dir.path().join("a.txt").exists());
}
