//! Synchronization engine.
//!
//! Listings of both sides are diffed into operations which a fixed pool of
//! workers executes concurrently.

pub mod diff;
pub mod engine;
pub mod executor;
pub mod scheduler;
pub mod stats;

pub use diff::{needs_update, plan, Differ, Job, OperationKind, Operations, SyncOperation};
pub use engine::SyncManager;
pub use executor::{local_target, remote_target, TransferDirection, TransferExecutor};
pub use scheduler::{JobHandler, WorkerPool};
pub use stats::{StatsRecorder, SyncStatistics};
