//! Error types for sync operations.
//!
//! `SyncError` covers every failure the engine can surface. Failures of
//! individual jobs are gathered by [`ErrorCollector`] and reported together
//! as an [`AggregateError`] once every job has finished.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// Errors produced while resolving, listing, or transferring files.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An endpoint could not be parsed as a URL.
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A storage URL without a bucket name, e.g. `s3:///key`.
    #[error("s3 url is missing bucket name")]
    MissingBucket { url: String },

    /// Storage-to-storage or local-to-local sync was requested.
    #[error("{0}")]
    UnsupportedDirection(&'static str),

    /// An ACL was configured for a store that cannot apply it.
    #[error("canned ACLs are not supported by {store}")]
    AclUnsupported { store: String },

    /// Listing one side of the sync failed.
    #[error("failed to list {location}: {source}")]
    Listing {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    /// Upload, download or remote delete failed in the object store.
    #[error("{action} {target} failed: {source}")]
    Transfer {
        action: &'static str,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// Local file create/open/remove/chtimes failure.
    #[error("I/O error while {operation} {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// The sync was cancelled before the job could finish.
    #[error("sync cancelled")]
    Cancelled,

    /// A worker task panicked.
    #[error("worker task failed: {0}")]
    Worker(String),

    /// One or more jobs failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl SyncError {
    /// Wrap an I/O error with the operation and path it happened on.
    pub fn io(err: io::Error, operation: &'static str, path: impl Into<PathBuf>) -> Self {
        SyncError::Io {
            path: path.into(),
            operation,
            source: err,
        }
    }

    /// Wrap a listing failure.
    pub fn listing(location: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        SyncError::Listing {
            location: location.into(),
            source: source.into(),
        }
    }

    /// Wrap an object store failure.
    pub fn transfer(action: &'static str, target: impl Into<String>, source: anyhow::Error) -> Self {
        SyncError::Transfer {
            action,
            target: target.into(),
            source,
        }
    }
}

/// Every error gathered during one sync, in the order they were recorded.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<SyncError>,
}

impl AggregateError {
    /// The individual errors.
    pub fn errors(&self) -> &[SyncError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SyncError> {
        self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Thread-safe, append-only collection of job errors.
///
/// Workers push into it concurrently; the sync driver turns it into a
/// single result after all workers are done.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Mutex<Vec<SyncError>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error.
    pub fn push(&self, err: SyncError) {
        self.lock().push(err);
    }

    /// Number of errors recorded so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Ok(())` when nothing was recorded, otherwise every error combined.
    /// Drains the collector.
    pub fn take_result(&self) -> Result<()> {
        let errors = std::mem::take(&mut *self.lock());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Aggregate(AggregateError { errors }))
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SyncError>> {
        // A worker that panicked mid-push cannot leave the Vec half-written.
        self.errors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
