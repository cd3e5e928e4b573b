//! Action logging.
//!
//! Every job describes what it does (or would do, on a dry run) through a
//! [`SyncLogger`] owned by the manager. There is no global logger.

use std::fmt;

/// Receives one human-readable line per sync action.
pub trait SyncLogger: Send + Sync {
    fn log(&self, message: fmt::Arguments<'_>);
}

/// Default logger: forwards actions to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl SyncLogger for TracingLogger {
    fn log(&self, message: fmt::Arguments<'_>) {
        tracing::info!(target: "s3sync::action", "{}", message);
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl SyncLogger for NullLogger {
    fn log(&self, _message: fmt::Arguments<'_>) {}
}

/// Collects messages in memory, mostly useful for tests and dry-run previews.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: std::sync::Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines logged so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl SyncLogger for MemoryLogger {
    fn log(&self, message: fmt::Arguments<'_>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}
