use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::fs::backend::ObjectStore;
use crate::fs::types::{base_name, FileDescriptor, Location, ObjectSummary};
use crate::fs::Listing;
use crate::path::StoragePath;

/// Buffer between the listing task and the diff engine. Object listings
/// can be large; the producer must not stall on a slow consumer.
pub const REMOTE_BUFFER: usize = 50_000;

/// List every object under `path`, following continuation tokens.
///
/// A listing error is sent as the last item.
pub fn list_files(store: Arc<dyn ObjectStore>, path: StoragePath) -> Listing {
    let (sender, receiver) = mpsc::channel(REMOTE_BUFFER);

    tokio::spawn(async move {
        let mut token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let page = match store
                .list_page(&path.bucket, &path.prefix, token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    let _ = sender.send(Err(SyncError::listing(path.to_string(), err))).await;
                    return;
                }
            };
            pages += 1;

            for object in page.objects {
                if let Some(file) = describe_object(&path, object) {
                    if sender.send(Ok(file)).await.is_err() {
                        return;
                    }
                }
            }

            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        debug!(path = %path, pages, "remote listing complete");
    });

    receiver
}

/// Turn a listed object into a descriptor relative to `path`.
///
/// Returns `None` for directory marker objects and for keys that only
/// share a string prefix with `path` (`photos` vs `photos-old/x`).
pub(crate) fn describe_object(path: &StoragePath, object: ObjectSummary) -> Option<FileDescriptor> {
    if object.key.ends_with('/') {
        return None;
    }

    let prefix = path.prefix.trim_end_matches('/');

    if !prefix.is_empty() && object.key == prefix {
        // The prefix names exactly one object
        return Some(FileDescriptor {
            name: base_name(&object.key).to_string(),
            location: Location::Object(object.key),
            size: object.size,
            modified: object.last_modified,
            single_file_root: true,
        });
    }

    let name = if prefix.is_empty() {
        object.key.as_str()
    } else {
        match object
            .key
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(rest) => rest,
            None => {
                debug!(key = %object.key, prefix, "skipping key outside of prefix");
                return None;
            }
        }
    };

    let name: Vec<&str> = name.split('/').filter(|part| !part.is_empty()).collect();
    if name.iter().any(|part| *part == "." || *part == "..") {
        warn!(key = %object.key, "skipping key with relative path components");
        return None;
    }
    let name = name.join("/");

    Some(FileDescriptor {
        name,
        location: Location::Object(object.key),
        size: object.size,
        modified: object.last_modified,
        single_file_root: false,
    })
}
