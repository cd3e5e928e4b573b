//! File listing and object storage access.

pub mod backend;
pub mod local;
pub mod memory;
pub mod remote;
pub mod s3;
pub mod types;

pub use backend::{ObjectStore, S3Provider, UploadBody, UploadRequest};
pub use memory::{MemoryStore, StoredObject};
pub use s3::S3Store;
pub use types::*;

use crate::error::SyncError;

/// A lazy, single-pass listing of one side of a sync. An `Err` item ends it.
pub type Listing = tokio::sync::mpsc::Receiver<Result<FileDescriptor, SyncError>>;
