use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use opendal::{services::S3, Operator};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::compat::{FuturesAsyncReadCompatExt, FuturesAsyncWriteCompatExt};
use tracing::debug;

use crate::fs::backend::{ObjectStore, S3Provider, UploadBody, UploadRequest};
use crate::fs::types::{ListPage, ObjectSummary};

/// Maximum number of keys returned by one `list_page` call.
const PAGE_SIZE: usize = 1000;

/// Part size for uploads; larger bodies go out as multipart uploads.
const WRITE_CHUNK: usize = 8 * 1024 * 1024;

#[derive(Clone)]
struct Credentials {
    access_key: String,
    secret_key: String,
}

/// S3 and S3-compatible object store using OpenDAL.
///
/// One operator is built per bucket on first use and reused afterwards.
pub struct S3Store {
    region: String,
    provider: S3Provider,
    credentials: Option<Credentials>,
    operators: Mutex<HashMap<String, Operator>>,
}

impl S3Store {
    /// Create a store for an S3-compatible provider with explicit credentials
    pub fn new(region: &str, access_key: &str, secret_key: &str, provider: S3Provider) -> Self {
        Self {
            region: region.to_string(),
            provider,
            credentials: Some(Credentials {
                access_key: access_key.to_string(),
                secret_key: secret_key.to_string(),
            }),
            operators: Mutex::new(HashMap::new()),
        }
    }

    /// Create a store that resolves credentials from the environment.
    ///
    /// Uses the standard AWS credential chain:
    /// 1. Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)
    /// 2. Shared credentials file (~/.aws/credentials)
    /// 3. EC2 Instance Profile / ECS Task Role / EKS Pod Identity
    pub fn with_default_credentials(region: &str, provider: S3Provider) -> Self {
        Self {
            region: region.to_string(),
            provider,
            credentials: None,
            operators: Mutex::new(HashMap::new()),
        }
    }

    /// AWS S3 using the instance/environment credential chain
    pub fn new_with_iam(region: &str) -> Self {
        Self::with_default_credentials(region, S3Provider::Aws)
    }

    pub fn new_aws(region: &str, access_key: &str, secret_key: &str) -> Self {
        Self::new(region, access_key, secret_key, S3Provider::Aws)
    }

    /// Custom S3-compatible endpoint
    pub fn new_custom(
        region: &str,
        endpoint: &str,
        name: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        Self::new(
            region,
            access_key,
            secret_key,
            S3Provider::Custom {
                name: name.to_string(),
                endpoint: endpoint.to_string(),
            },
        )
    }

    pub fn provider(&self) -> &S3Provider {
        &self.provider
    }

    fn operator(&self, bucket: &str) -> Result<Operator> {
        let mut operators = self
            .operators
            .lock()
            .map_err(|_| anyhow!("S3 operator cache lock poisoned"))?;
        if let Some(operator) = operators.get(bucket) {
            return Ok(operator.clone());
        }

        let mut builder = S3::default().bucket(bucket).region(&self.region);

        // Set custom endpoint for S3-compatible providers
        if let Some(endpoint) = self.provider.endpoint() {
            builder = builder.endpoint(endpoint);
        }
        // Without explicit keys OpenDAL falls back to the AWS credential chain
        if let Some(credentials) = &self.credentials {
            builder = builder
                .access_key_id(&credentials.access_key)
                .secret_access_key(&credentials.secret_key);
        }

        let operator = Operator::new(builder)
            .with_context(|| format!("Failed to configure S3 bucket {}", bucket))?
            .finish();
        operators.insert(bucket.to_string(), operator.clone());
        Ok(operator)
    }
}

/// Stream `body` into `key`, `chunk` bytes per part.
async fn write_object(
    operator: &Operator,
    key: &str,
    content_type: Option<&str>,
    chunk: usize,
    mut body: UploadBody,
) -> Result<u64> {
    let mut write = operator.writer_with(key).chunk(chunk);
    if let Some(content_type) = content_type {
        write = write.content_type(content_type);
    }
    let mut writer = write
        .await
        .context("Failed to start S3 upload")?
        .into_futures_async_write()
        .compat_write();

    let size = tokio::io::copy(&mut body, &mut writer)
        .await
        .context("Failed to upload to S3")?;
    // Completes the (multipart) upload
    writer.shutdown().await.context("Failed to finish S3 upload")?;

    Ok(size)
}

/// Stream the object at `key` into `writer`.
async fn read_object(
    operator: &Operator,
    key: &str,
    writer: &mut (dyn AsyncWrite + Send + Unpin),
) -> Result<u64> {
    let mut reader = operator
        .reader(key)
        .await
        .context("Failed to open S3 object")?
        .into_futures_async_read(..)
        .await
        .context("Failed to open S3 object")?
        .compat();

    let size = tokio::io::copy(&mut reader, writer)
        .await
        .context("Failed to download from S3")?;
    writer.flush().await.context("Failed to flush downloaded object")?;

    Ok(size)
}

/// Convert whatever timestamp type OpenDAL reports into UTC.
fn to_utc<T: Into<SystemTime>>(time: T) -> DateTime<Utc> {
    DateTime::<Utc>::from(time.into())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage> {
        let operator = self.operator(bucket)?;

        let lister = operator.lister_with(prefix).recursive(true);
        let lister = match continuation_token {
            Some(token) => lister.start_after(token),
            None => lister,
        };
        let mut lister = lister
            .await
            .with_context(|| format!("Failed to list s3://{}/{}", bucket, prefix))?;

        let mut objects = Vec::new();
        while let Some(entry) = lister
            .try_next()
            .await
            .context("Failed to read S3 listing")?
        {
            let key = entry.path().to_string();
            let metadata = entry.metadata();

            let last_modified = match metadata.last_modified() {
                Some(time) => to_utc(time),
                // Some listings omit timestamps; ask for the object itself
                None => operator
                    .stat(&key)
                    .await
                    .with_context(|| format!("Failed to stat s3://{}/{}", bucket, key))?
                    .last_modified()
                    .map(to_utc)
                    .unwrap_or_else(|| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH)),
            };

            objects.push(ObjectSummary {
                key,
                size: metadata.content_length(),
                last_modified,
            });

            if objects.len() >= PAGE_SIZE {
                break;
            }
        }

        let next_continuation_token = if objects.len() >= PAGE_SIZE {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };
        debug!(bucket, prefix, count = objects.len(), "listed S3 page");

        Ok(ListPage {
            objects,
            next_continuation_token,
        })
    }

    async fn upload(&self, request: UploadRequest) -> Result<u64> {
        if request.acl.is_some() {
            return Err(anyhow!("canned ACLs are not supported by {}", self.describe()));
        }
        let operator = self.operator(&request.bucket)?;
        write_object(
            &operator,
            &request.key,
            request.content_type.as_deref(),
            WRITE_CHUNK,
            request.body,
        )
        .await
    }

    async fn download(
        &self,
        bucket: &str,
        key: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        let operator = self.operator(bucket)?;
        read_object(&operator, key, writer).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let operator = self.operator(bucket)?;
        operator
            .delete(key)
            .await
            .context("Failed to delete S3 object")?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.provider.display_name(), self.region)
    }

    /// OpenDAL's S3 service has no way to send `x-amz-acl`.
    fn supports_acl(&self) -> bool {
        false
    }
}
