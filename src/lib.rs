// Library module for s3sync
// Re-exports modules for use in integration tests and external crates

pub mod config;
pub mod error;
pub mod fs;
pub mod logger;
pub mod mime;
pub mod path;
pub mod sync;

pub use config::SyncConfig;
pub use error::{AggregateError, ErrorCollector, Result, SyncError};
pub use fs::{MemoryStore, ObjectStore, S3Provider, S3Store};
pub use logger::{MemoryLogger, NullLogger, SyncLogger, TracingLogger};
pub use path::{Endpoint, StoragePath, SyncDirection};
pub use sync::{SyncManager, SyncStatistics};
