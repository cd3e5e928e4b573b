//! In-process object store.
//!
//! Keeps objects in sorted maps so listings page deterministically. Failures
//! can be injected per key or per bucket listing.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::fs::backend::{ObjectStore, UploadRequest};
use crate::fs::types::{ListPage, ObjectSummary};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// One stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
    pub acl: Option<String>,
}

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
    failing_keys: HashSet<(String, String)>,
    // bucket -> pages served before listings start failing
    failing_listings: HashMap<String, usize>,
    served_pages: HashMap<String, usize>,
}

/// Object store backed by memory.
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: usize,
    acl_support: bool,
    list_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
            acl_support: true,
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Limit the number of keys per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Behave like a backend that cannot apply canned ACLs.
    pub fn without_acl_support(mut self) -> Self {
        self.acl_support = false;
        self
    }

    /// Store an object with an explicit modification time.
    pub fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) {
        self.lock().buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                last_modified,
                content_type: None,
                acl: None,
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    /// All keys in a bucket, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every upload, download and delete of this key fail.
    pub fn fail_key(&self, bucket: &str, key: &str) {
        self.lock()
            .failing_keys
            .insert((bucket.to_string(), key.to_string()));
    }

    /// Make every listing of this bucket fail.
    pub fn fail_listing(&self, bucket: &str) {
        self.fail_listing_after(bucket, 0);
    }

    /// Serve `pages` listing pages of this bucket, then fail every later one.
    pub fn fail_listing_after(&self, bucket: &str, pages: usize) {
        let mut state = self.lock();
        state.failing_listings.insert(bucket.to_string(), pages);
        state.served_pages.remove(bucket);
    }

    /// Number of `list_page` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_key(&self, bucket: &str, key: &str) -> Result<()> {
        if self
            .lock()
            .failing_keys
            .contains(&(bucket.to_string(), key.to_string()))
        {
            bail!("injected failure for s3://{}/{}", bucket, key);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();
        if let Some(&limit) = state.failing_listings.get(bucket) {
            let served = state.served_pages.entry(bucket.to_string()).or_default();
            if *served >= limit {
                bail!("injected listing failure for bucket {}", bucket);
            }
            *served += 1;
        }

        let Some(objects) = state.buckets.get(bucket) else {
            return Ok(ListPage::default());
        };

        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation_token.map_or(true, |token| key.as_str() > token));

        let page: Vec<ObjectSummary> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: object.last_modified,
            })
            .collect();

        let next_continuation_token = if matching.next().is_some() {
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects: page,
            next_continuation_token,
        })
    }

    async fn upload(&self, request: UploadRequest) -> Result<u64> {
        self.check_key(&request.bucket, &request.key)?;

        let mut body = request.body;
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        let size = data.len() as u64;

        self.lock()
            .buckets
            .entry(request.bucket)
            .or_default()
            .insert(
                request.key,
                StoredObject {
                    data,
                    last_modified: Utc::now(),
                    content_type: request.content_type,
                    acl: request.acl,
                },
            );
        Ok(size)
    }

    async fn download(
        &self,
        bucket: &str,
        key: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        self.check_key(bucket, key)?;

        let data = self
            .object(bucket, key)
            .ok_or_else(|| anyhow!("no such key: s3://{}/{}", bucket, key))?
            .data;
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(data.len() as u64)
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.check_key(bucket, key)?;

        if let Some(objects) = self.lock().buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn supports_acl(&self) -> bool {
        self.acl_support
    }
}
