//! Sync driver.
//!
//! Resolves the direction of a sync, runs both listings concurrently, diffs
//! them and feeds the resulting operations to a bounded worker pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::fs::{local, remote, Listing, ObjectStore};
use crate::logger::{SyncLogger, TracingLogger};
use crate::path::{resolve, SyncDirection};
use crate::sync::diff::plan;
use crate::sync::executor::{TransferDirection, TransferExecutor};
use crate::sync::scheduler::WorkerPool;
use crate::sync::stats::{StatsRecorder, SyncStatistics};

/// Synchronizes local paths with object storage prefixes.
///
/// A manager can run any number of syncs; its statistics accumulate over
/// all of them.
pub struct SyncManager {
    store: Arc<dyn ObjectStore>,
    config: Arc<SyncConfig>,
    logger: Arc<dyn SyncLogger>,
    stats: Arc<StatsRecorder>,
}

impl SyncManager {
    pub fn new(store: Arc<dyn ObjectStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            logger: Arc::new(TracingLogger),
            stats: Arc::new(StatsRecorder::new()),
        }
    }

    /// Send action lines to `logger` instead of `tracing`.
    pub fn with_logger(mut self, logger: Arc<dyn SyncLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Snapshot of the cumulative statistics.
    pub fn statistics(&self) -> SyncStatistics {
        self.stats.snapshot()
    }

    /// Make `dest` match `source`. One side must be an `s3://` URL, the
    /// other a local path.
    pub async fn sync(&self, source: &str, dest: &str) -> Result<()> {
        self.sync_with_cancel(source, dest, CancellationToken::new())
            .await
    }

    /// Like [`sync`](Self::sync), stopping early once `cancel` fires.
    ///
    /// Files already written stay in place. Returns `Cancelled` when the
    /// only failures were transfers interrupted by the cancellation; other
    /// failures are still reported as an aggregate.
    pub async fn sync_with_cancel(&self, source: &str, dest: &str, cancel: CancellationToken) -> Result<()> {
        let started = Instant::now();
        let result = self.run(source, dest, &cancel).await;
        self.stats.add_elapsed(started.elapsed());
        result
    }

    async fn run(&self, source: &str, dest: &str, cancel: &CancellationToken) -> Result<()> {
        let direction = resolve(source, dest)?;
        if matches!(direction, SyncDirection::LocalToRemote { .. })
            && self.config.acl.is_some()
            && !self.store.supports_acl()
        {
            return Err(SyncError::AclUnsupported {
                store: self.store.describe(),
            });
        }
        info!(
            source,
            dest,
            store = %self.store.describe(),
            dry_run = self.config.dry_run,
            "starting sync"
        );

        let (source_listing, dest_listing) = self.listings(&direction);

        let mut operations = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            operations = plan(dest_listing, source_listing, self.config.delete) => operations?,
        };

        let executor = TransferExecutor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            Arc::clone(&self.logger),
            Arc::clone(&self.stats),
            cancel.clone(),
            TransferDirection::from(&direction),
        );
        let pool = WorkerPool::spawn(self.config.parallel, Arc::new(executor), cancel.clone());

        let mut dispatched = 0usize;
        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = operations.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            pool.submit(job).await;
            dispatched += 1;
        }
        drop(operations);

        let result = pool.finish().await;
        debug!(dispatched, failed = result.is_err(), "all operations finished");

        match result {
            Ok(()) if cancel.is_cancelled() => Err(SyncError::Cancelled),
            Ok(()) => {
                info!(operations = dispatched, "sync complete");
                Ok(())
            }
            Err(SyncError::Aggregate(errors))
                if cancel.is_cancelled()
                    && errors.errors().iter().all(|err| matches!(err, SyncError::Cancelled)) =>
            {
                Err(SyncError::Cancelled)
            }
            Err(err) => Err(err),
        }
    }

    /// Start the (source, destination) listings.
    fn listings(&self, direction: &SyncDirection) -> (Listing, Listing) {
        match direction {
            SyncDirection::LocalToRemote { source, dest } => (
                local::list_files(source.clone()),
                remote::list_files(Arc::clone(&self.store), dest.clone()),
            ),
            SyncDirection::RemoteToLocal { source, dest } => (
                remote::list_files(Arc::clone(&self.store), source.clone()),
                local::list_files(PathBuf::from(dest)),
            ),
        }
    }
}
