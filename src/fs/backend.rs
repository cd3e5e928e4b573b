use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::fs::types::ListPage;

/// Where an [`S3Store`](crate::fs::S3Store) sends its requests.
#[derive(Debug, Clone, PartialEq)]
pub enum S3Provider {
    /// Amazon S3, regional endpoint derived by the client.
    Aws,
    /// Any S3-compatible service (MinIO, R2, Spaces, ...).
    Custom { name: String, endpoint: String },
}

impl S3Provider {
    /// Explicit endpoint URL, `None` for AWS.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            S3Provider::Aws => None,
            S3Provider::Custom { endpoint, .. } => Some(endpoint),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            S3Provider::Aws => "AWS S3",
            S3Provider::Custom { name, .. } => name,
        }
    }
}

/// Body of an upload.
pub type UploadBody = Box<dyn AsyncRead + Send + Unpin>;

/// Upload of one object.
pub struct UploadRequest {
    pub bucket: String,
    pub key: String,
    /// Canned ACL, e.g. `public-read`.
    pub acl: Option<String>,
    pub content_type: Option<String>,
    pub body: UploadBody,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("acl", &self.acl)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Object storage operations the sync engine needs.
///
/// Implementations own retries, multipart handling and credentials; the
/// engine awaits each call to completion before treating the job as done.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    // ========== Listing ==========

    /// List one page of objects under `prefix`.
    ///
    /// Pass the previous page's `next_continuation_token` to continue;
    /// listing is complete when a page returns no token.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage>;

    // ========== Transfer ==========

    /// Upload an object, returning the number of bytes written.
    async fn upload(&self, request: UploadRequest) -> Result<u64>;

    /// Stream an object into `writer`, returning the number of bytes read.
    async fn download(
        &self,
        bucket: &str,
        key: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64>;

    /// Delete one object.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    // ========== Info ==========

    /// Whether uploads can carry a canned ACL.
    fn supports_acl(&self) -> bool {
        true
    }

    /// Short description used in log lines.
    fn describe(&self) -> String {
        "object store".to_string()
    }
}
