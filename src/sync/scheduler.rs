//! Fixed-size worker pool executing sync jobs.
//!
//! Jobs are pulled from one shared queue by `n` tokio tasks. Failures are
//! recorded in an [`ErrorCollector`] and never stop the other workers.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{ErrorCollector, Result, SyncError};
use crate::sync::diff::{Job, SyncOperation};

/// Executes one operation.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, operation: SyncOperation) -> Result<()>;
}

/// Bounded pool of workers sharing one job queue.
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: JoinSet<()>,
    errors: Arc<ErrorCollector>,
}

impl WorkerPool {
    /// Start `workers` tasks (at least one) feeding jobs to `handler`.
    ///
    /// Once `cancel` fires, queued jobs are dropped without running.
    pub fn spawn(workers: usize, handler: Arc<dyn JobHandler>, cancel: CancellationToken) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(workers);
        let receiver = Arc::new(Mutex::new(receiver));
        let errors = Arc::new(ErrorCollector::new());

        let mut set = JoinSet::new();
        for id in 0..workers {
            let receiver = Arc::clone(&receiver);
            let handler = Arc::clone(&handler);
            let errors = Arc::clone(&errors);
            let cancel = cancel.clone();

            set.spawn(async move {
                loop {
                    let job = receiver.lock().await.recv().await;
                    let Some(job) = job else { break };

                    if cancel.is_cancelled() {
                        continue;
                    }
                    let result = match job {
                        Ok(operation) => handler.handle(operation).await,
                        Err(err) => Err(err),
                    };
                    if let Err(err) = result {
                        errors.push(err);
                    }
                }
                trace!(worker = id, "worker finished");
            });
        }
        debug!(workers, "worker pool started");

        Self {
            sender,
            workers: set,
            errors,
        }
    }

    /// Queue one job, waiting while every worker is busy.
    pub async fn submit(&self, job: Job) {
        if let Err(mpsc::error::SendError(job)) = self.sender.send(job).await {
            // Only possible when every worker has died
            let err = match job {
                Ok(operation) => SyncError::Worker(format!("no worker left for {}", operation.file.name)),
                Err(err) => err,
            };
            self.errors.push(err);
        }
    }

    /// Close the queue, wait for every queued job, and return the combined result.
    pub async fn finish(self) -> Result<()> {
        let WorkerPool {
            sender,
            mut workers,
            errors,
        } = self;
        drop(sender);

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                errors.push(SyncError::Worker(err.to_string()));
            }
        }

        errors.take_result()
    }
}
