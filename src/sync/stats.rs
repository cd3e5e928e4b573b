//! Transfer statistics.

use humansize::{format_size, DECIMAL};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of what the syncs of one manager have done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatistics {
    /// Bytes uploaded or downloaded.
    pub bytes: u64,
    /// Files uploaded or downloaded.
    pub files: u64,
    /// Files deleted from the destination.
    pub deleted_files: u64,
    /// Wall time spent in sync calls.
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

impl SyncStatistics {
    /// Average transfer rate in bytes per second.
    pub fn rate(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Format rate as human-readable string.
    pub fn rate_display(&self) -> String {
        format!("{}/s", format_size(self.rate() as u64, DECIMAL))
    }
}

/// Lock-free counters shared by every worker.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    bytes: AtomicU64,
    files: AtomicU64,
    deleted_files: AtomicU64,
    elapsed_nanos: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed upload or download.
    pub fn record_transfer(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed delete.
    pub fn record_delete(&self) {
        self.deleted_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_elapsed(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncStatistics {
        SyncStatistics {
            bytes: self.bytes.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            deleted_files: self.deleted_files.load(Ordering::Relaxed),
            elapsed: Duration::from_nanos(self.elapsed_nanos.load(Ordering::Relaxed)),
        }
    }
}
