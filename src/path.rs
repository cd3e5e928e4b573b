//! Endpoint classification and storage URL parsing.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{Result, SyncError};

/// URL scheme identifying object storage endpoints.
pub const STORAGE_SCHEME: &str = "s3";

/// A bucket plus a key prefix inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath {
    pub bucket: String,
    /// Key prefix without a leading slash. May be empty.
    pub prefix: String,
}

impl StoragePath {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            bucket: bucket.into(),
            prefix: prefix.trim_start_matches('/').to_string(),
        }
    }

    /// Decompose a storage URL into bucket and prefix.
    pub fn from_url(url: &Url) -> Result<Self> {
        let bucket = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => {
                return Err(SyncError::MissingBucket {
                    url: url.to_string(),
                })
            }
        };
        let path = urlencoding::decode(url.path())
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| url.path().to_string());

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: path.replace('\\', "/").trim_start_matches('/').to_string(),
        })
    }

    /// Copy of this path with `name` appended under the prefix.
    pub fn join(&self, name: &str) -> Self {
        let prefix = self.prefix.trim_end_matches('/');
        let name = name.trim_start_matches('/');
        Self {
            bucket: self.bucket.clone(),
            prefix: if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", prefix, name)
            },
        }
    }

    /// True when the prefix names a directory rather than one object.
    pub fn is_dir_like(&self) -> bool {
        self.prefix.is_empty() || self.prefix.ends_with('/')
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", STORAGE_SCHEME, self.bucket, self.prefix)
    }
}

/// One side of a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Local(PathBuf),
    Remote(StoragePath),
}

impl Endpoint {
    /// Classify an endpoint string. Only `s3://` URLs are remote.
    pub fn parse(endpoint: &str) -> Result<Self> {
        match Url::parse(endpoint) {
            Ok(url) if url.scheme() == STORAGE_SCHEME => {
                Ok(Endpoint::Remote(StoragePath::from_url(&url)?))
            }
            Ok(_) => Ok(Endpoint::Local(PathBuf::from(endpoint))),
            // Plain filesystem paths are relative URLs without a base.
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Endpoint::Local(PathBuf::from(endpoint)))
            }
            Err(source) if endpoint.starts_with(STORAGE_SCHEME) => Err(SyncError::InvalidUrl {
                url: endpoint.to_string(),
                source,
            }),
            Err(_) => Ok(Endpoint::Local(PathBuf::from(endpoint))),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Endpoint::Remote(_))
    }
}

/// Which side drives the sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDirection {
    /// Download a bucket prefix into a local path.
    RemoteToLocal { source: StoragePath, dest: String },
    /// Upload a local path under a bucket prefix.
    LocalToRemote { source: PathBuf, dest: StoragePath },
}

/// Resolve the direction of a sync from its two endpoints.
pub fn resolve(source: &str, dest: &str) -> Result<SyncDirection> {
    let source_endpoint = Endpoint::parse(source)?;
    let dest_endpoint = Endpoint::parse(dest)?;

    match (source_endpoint, dest_endpoint) {
        (Endpoint::Remote(source), Endpoint::Local(_)) => Ok(SyncDirection::RemoteToLocal {
            source,
            // Keep the raw string: a trailing separator marks a directory target.
            dest: dest.to_string(),
        }),
        (Endpoint::Local(source), Endpoint::Remote(dest)) => {
            Ok(SyncDirection::LocalToRemote { source, dest })
        }
        (Endpoint::Remote(_), Endpoint::Remote(_)) => Err(SyncError::UnsupportedDirection(
            "S3 to S3 sync feature is not implemented",
        )),
        (Endpoint::Local(_), Endpoint::Local(_)) => Err(SyncError::UnsupportedDirection(
            "local to local sync is not supported",
        )),
    }
}

/// True when a local path string ends with a path separator.
pub(crate) fn ends_with_separator(path: &str) -> bool {
    path.ends_with('/') || path.ends_with(std::path::MAIN_SEPARATOR)
}
