//! Per-operation transfer logic.
//!
//! Maps a [`SyncOperation`] onto one upload, download or delete call.
//! Every action is logged before it runs; under dry-run it is only logged.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::fs::local::set_modified;
use crate::fs::{FileDescriptor, Location, ObjectStore, UploadRequest};
use crate::logger::SyncLogger;
use crate::mime::detect_content_type;
use crate::path::{ends_with_separator, StoragePath, SyncDirection};
use crate::sync::diff::{OperationKind, SyncOperation};
use crate::sync::scheduler::JobHandler;
use crate::sync::stats::StatsRecorder;

/// Which way files move, with the roots needed to compute targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferDirection {
    /// Local files are uploaded under `dest`.
    Upload { dest: StoragePath },
    /// Objects under `source` are downloaded into `dest_root`.
    Download { source: StoragePath, dest_root: String },
}

impl From<&SyncDirection> for TransferDirection {
    fn from(direction: &SyncDirection) -> Self {
        match direction {
            SyncDirection::LocalToRemote { dest, .. } => TransferDirection::Upload { dest: dest.clone() },
            SyncDirection::RemoteToLocal { source, dest } => TransferDirection::Download {
                source: source.clone(),
                dest_root: dest.clone(),
            },
        }
    }
}

/// Object key a file is uploaded to, or deleted from.
///
/// A single source file synced to a prefix that is not directory-like
/// goes to that exact key.
pub fn remote_target(dest: &StoragePath, file: &FileDescriptor) -> StoragePath {
    if file.single_file_root && !dest.is_dir_like() {
        dest.clone()
    } else {
        dest.join(&file.name)
    }
}

/// Local path a file is downloaded to, or deleted from.
///
/// A single source object synced to a path without a trailing separator
/// goes to that exact path.
pub fn local_target(dest_root: &str, file: &FileDescriptor) -> PathBuf {
    if file.single_file_root && !ends_with_separator(dest_root) {
        PathBuf::from(dest_root)
    } else {
        Path::new(dest_root).join(&file.name)
    }
}

/// Executes sync operations against an [`ObjectStore`] and the local disk.
pub struct TransferExecutor {
    store: Arc<dyn ObjectStore>,
    config: Arc<SyncConfig>,
    logger: Arc<dyn SyncLogger>,
    stats: Arc<StatsRecorder>,
    cancel: CancellationToken,
    direction: TransferDirection,
}

impl TransferExecutor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: Arc<SyncConfig>,
        logger: Arc<dyn SyncLogger>,
        stats: Arc<StatsRecorder>,
        cancel: CancellationToken,
        direction: TransferDirection,
    ) -> Self {
        Self {
            store,
            config,
            logger,
            stats,
            cancel,
            direction,
        }
    }

    /// Run `future` unless the sync is cancelled first.
    async fn cancellable<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            result = future => result,
        }
    }

    async fn upload(&self, file: &FileDescriptor, dest: &StoragePath) -> Result<()> {
        let target = remote_target(dest, file);
        self.logger
            .log(format_args!("Uploading {} to {}", file.name, target));
        if self.config.dry_run {
            return Ok(());
        }

        let Location::Local(source) = &file.location else {
            return Err(SyncError::transfer(
                "upload",
                target.to_string(),
                anyhow::anyhow!("{} is not a local file", file.location),
            ));
        };

        let content_type = match &self.config.content_type {
            Some(content_type) => Some(content_type.clone()),
            None if self.config.guess_mime => Some(detect_content_type(source).await?),
            None => None,
        };

        let body = tokio::fs::File::open(source)
            .await
            .map_err(|e| SyncError::io(e, "opening", source))?;

        let request = UploadRequest {
            bucket: target.bucket.clone(),
            key: target.prefix.clone(),
            acl: self.config.acl.clone(),
            content_type,
            body: Box::new(body),
        };
        let bytes = self
            .store
            .upload(request)
            .await
            .map_err(|e| SyncError::transfer("upload", target.to_string(), e))?;

        self.stats.record_transfer(bytes);
        trace!(target = %target, bytes, "upload complete");
        Ok(())
    }

    async fn download(&self, file: &FileDescriptor, source: &StoragePath, dest_root: &str) -> Result<()> {
        let target = local_target(dest_root, file);
        self.logger
            .log(format_args!("Downloading {} to {}", file.name, target.display()));
        if self.config.dry_run {
            return Ok(());
        }

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(e, "creating directory", parent))?;
        }

        let key = match &file.location {
            Location::Object(key) => key.clone(),
            Location::Local(_) => source.join(&file.name).prefix,
        };

        let mut writer = tokio::fs::File::create(&target)
            .await
            .map_err(|e| SyncError::io(e, "creating", &target))?;
        let bytes = self
            .store
            .download(&source.bucket, &key, &mut writer)
            .await
            .map_err(|e| SyncError::transfer("download", StoragePath::new(&source.bucket, &key).to_string(), e))?;
        writer
            .flush()
            .await
            .map_err(|e| SyncError::io(e, "writing", &target))?;
        drop(writer);

        // Record the source time so the next diff sees the copy as current
        set_modified(&target, file.modified)
            .map_err(|e| SyncError::io(e, "setting modification time of", &target))?;

        self.stats.record_transfer(bytes);
        trace!(target = %target.display(), bytes, "download complete");
        Ok(())
    }

    async fn delete_local(&self, file: &FileDescriptor, dest_root: &str) -> Result<()> {
        let target = local_target(dest_root, file);
        self.logger.log(format_args!("Deleting {}", target.display()));
        if self.config.dry_run {
            return Ok(());
        }

        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| SyncError::io(e, "removing", &target))?;
        self.stats.record_delete();
        Ok(())
    }

    async fn delete_remote(&self, file: &FileDescriptor, dest: &StoragePath) -> Result<()> {
        let target = remote_target(dest, file);
        self.logger.log(format_args!("Deleting {}", target));
        if self.config.dry_run {
            return Ok(());
        }

        self.store
            .delete(&target.bucket, &target.prefix)
            .await
            .map_err(|e| SyncError::transfer("delete", target.to_string(), e))?;
        self.stats.record_delete();
        Ok(())
    }
}

#[async_trait]
impl JobHandler for TransferExecutor {
    async fn handle(&self, operation: SyncOperation) -> Result<()> {
        let file = &operation.file;
        let result = match (&self.direction, operation.kind) {
            (TransferDirection::Upload { dest }, OperationKind::Update) => {
                self.cancellable(self.upload(file, dest)).await
            }
            (TransferDirection::Upload { dest }, OperationKind::Delete) => {
                self.cancellable(self.delete_remote(file, dest)).await
            }
            (TransferDirection::Download { source, dest_root }, OperationKind::Update) => {
                self.cancellable(self.download(file, source, dest_root)).await
            }
            (TransferDirection::Download { dest_root, .. }, OperationKind::Delete) => {
                self.cancellable(self.delete_local(file, dest_root)).await
            }
        };

        if let Err(err) = &result {
            warn!(file = %file.name, error = %err, "sync operation failed");
        }
        result
    }
}
