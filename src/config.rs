//! Sync configuration.

use serde::Serialize;

/// Default number of parallel file sync jobs.
pub const DEFAULT_PARALLEL: usize = 16;

/// Sync configuration.
///
/// Built before a sync starts and shared read-only with every worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConfig {
    /// Number of worker tasks executing jobs.
    pub parallel: usize,
    /// Delete destination files that don't exist in the source.
    pub delete: bool,
    /// Log the actions without touching the destination.
    pub dry_run: bool,
    /// Canned ACL applied to uploaded objects.
    pub acl: Option<String>,
    /// Content type applied to every uploaded object.
    pub content_type: Option<String>,
    /// Sniff the content type of uploaded files.
    pub guess_mime: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            parallel: DEFAULT_PARALLEL,
            delete: false,
            dry_run: false,
            acl: None,
            content_type: None,
            guess_mime: true,
        }
    }
}

impl SyncConfig {
    /// Set the maximum number of parallel jobs. Zero is treated as one.
    pub fn with_parallel(mut self, n: usize) -> Self {
        self.parallel = n.max(1);
        self
    }

    pub fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    /// Use a fixed content type instead of guessing one per file.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_guess_mime(mut self, guess_mime: bool) -> Self {
        self.guess_mime = guess_mime;
        self
    }
}
