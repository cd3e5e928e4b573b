// Local to remote syncs

use crate::common::*;
use s3sync::mime::{OCTET_STREAM, TEXT_PLAIN};
use s3sync::{MemoryStore, SyncConfig};
use std::sync::Arc;

const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

#[tokio::test]
async fn test_upload_guesses_content_types() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("index.txt"), b"plain words", 100);
    write_local(&dir.path().join("img/logo.png"), &PNG, 100);
    write_local(&dir.path().join("blob.bin"), &[0x00, 0xFF, 0x13], 100);
    let store = Arc::new(MemoryStore::new());

    let (manager, _) = new_manager(&store, SyncConfig::default());
    manager.sync(&root(dir.path()), "s3://bucket/site/").await.unwrap();

    let content_type = |key: &str| store.object(BUCKET, key).unwrap().content_type;
    assert_eq!(content_type("site/index.txt").as_deref(), Some(TEXT_PLAIN));
    assert_eq!(content_type("site/img/logo.png").as_deref(), Some("image/png"));
    assert_eq!(content_type("site/blob.bin").as_deref(), Some(OCTET_STREAM));
}

#[tokio::test]
async fn test_content_type_override_wins() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("logo.png"), &PNG, 100);
    let store = Arc::new(MemoryStore::new());

    let config = SyncConfig::default().with_content_type("application/x-custom");
    let (manager, _) = new_manager(&store, config);
    manager.sync(&root(dir.path()), "s3://bucket").await.unwrap();

    let object = store.object(BUCKET, "logo.png").unwrap();
    assert_eq!(object.content_type.as_deref(), Some("application/x-custom"));
}

#[tokio::test]
async fn test_no_guess_leaves_content_type_unset() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"text", 100);
    let store = Arc::new(MemoryStore::new());

    let (manager, _) = new_manager(&store, SyncConfig::default().with_guess_mime(false));
    manager.sync(&root(dir.path()), "s3://bucket/p").await.unwrap();

    assert!(store.object(BUCKET, "p/a.txt").unwrap().content_type.is_none());
}

#[tokio::test]
async fn test_acl_is_passed_through() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"text", 100);
    let store = Arc::new(MemoryStore::new());

    let (manager, _) = new_manager(&store, SyncConfig::default().with_acl("public-read"));
    manager.sync(&root(dir.path()), "s3://bucket/p").await.unwrap();

    assert_eq!(store.object(BUCKET, "p/a.txt").unwrap().acl.as_deref(), Some("public-read"));
}

#[tokio::test]
async fn test_upload_statistics() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"12345", 100);
    write_local(&dir.path().join("b.txt"), b"123", 100);
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "p/gone.txt", b"x".to_vec(), at(1));

    let config = SyncConfig::default().with_delete(true).with_parallel(1);
    let (manager, _) = new_manager(&store, config);
    manager.sync(&root(dir.path()), "s3://bucket/p").await.unwrap();

    let stats = manager.statistics();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.bytes, 8);
    assert_eq!(stats.deleted_files, 1);
}

#[tokio::test]
async fn test_missing_local_source_deletes_everything_in_delete_mode() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "p/a.txt", b"a".to_vec(), at(1));
    store.put_object(BUCKET, "p/sub/b.txt", b"b".to_vec(), at(1));
    store.put_object(BUCKET, "other/c.txt", b"c".to_vec(), at(1));

    let source = root(&dir.path().join("does-not-exist"));
    let (manager, _) = new_manager(&store, SyncConfig::default().with_delete(true));
    manager.sync(&source, "s3://bucket/p").await.unwrap();

    assert_eq!(store.keys(BUCKET), vec!["other/c.txt"]);
}

#[tokio::test]
async fn test_keys_sharing_a_string_prefix_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    write_local(&dir.path().join("a.txt"), b"a", 100);
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET, "photos-old/x.jpg", b"x".to_vec(), at(1));

    let (manager, _) = new_manager(&store, SyncConfig::default().with_delete(true));
    manager.sync(&root(dir.path()), "s3://bucket/photos").await.unwrap();

    assert_eq!(store.keys(BUCKET), vec!["photos-old/x.jpg", "photos/a.txt"]);
}
