use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Where a listed file actually lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Absolute or caller-relative path on the local filesystem.
    Local(PathBuf),
    /// Full object key inside the listed bucket.
    Object(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Object(key) => f.write_str(key),
        }
    }
}

/// One file on either side of a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Path relative to the sync root, `/`-separated. For a single-file
    /// root this is the file's base name.
    pub name: String,
    pub location: Location,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// The sync root itself names exactly this file.
    pub single_file_root: bool,
}

/// Object metadata returned by a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// One page of an object listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    /// Token for the next page; `None` on the last page.
    pub next_continuation_token: Option<String>,
}

/// Last path component of a `/`-separated key or path.
pub(crate) fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
