use chrono::{DateTime, Utc};
use filetime::FileTime;
use jwalk::WalkDir;
use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::mpsc::{self, Sender};
use tracing::debug;

use crate::error::SyncError;
use crate::fs::types::{FileDescriptor, Location};
use crate::fs::Listing;

/// Buffer between the walker thread and the diff engine.
const LOCAL_BUFFER: usize = 1024;

/// List every regular file under `root` on a blocking thread.
///
/// A missing root yields nothing. A root that is a file yields exactly one
/// single-file-root descriptor. A walk error is sent as the last item.
pub fn list_files(root: PathBuf) -> Listing {
    let (sender, receiver) = mpsc::channel(LOCAL_BUFFER);
    tokio::task::spawn_blocking(move || walk(&root, &sender));
    receiver
}

fn walk(root: &Path, sender: &Sender<Result<FileDescriptor, SyncError>>) {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(root = %root.display(), "local root does not exist, nothing to list");
            return;
        }
        Err(err) => {
            let _ = sender.blocking_send(Err(SyncError::listing(root.display().to_string(), err)));
            return;
        }
    };

    if !metadata.is_dir() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = sender.blocking_send(Ok(descriptor(name, root.to_path_buf(), &metadata, true)));
        return;
    }

    for entry_result in WalkDir::new(root)
        .sort(true)
        .skip_hidden(false) // Don't skip hidden files
        .follow_links(false) // Don't follow symlinks to avoid loops
    {
        let mut entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let _ = sender.blocking_send(Err(SyncError::listing(root.display().to_string(), err)));
                return;
            }
        };

        // Unreadable directory: jwalk reports it on the entry and keeps going
        if let Some(err) = entry.read_children_error.take() {
            let _ = sender.blocking_send(Err(SyncError::listing(entry.path().display().to_string(), err)));
            return;
        }

        // Only regular files; directories are implied by their contents
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                let _ = sender.blocking_send(Err(SyncError::listing(path.display().to_string(), err)));
                return;
            }
        };

        let name = relative_name(root, &path);
        if sender
            .blocking_send(Ok(descriptor(name, path, &metadata, false)))
            .is_err()
        {
            // Receiver has been dropped, stop walking
            return;
        }
    }
}

fn descriptor(name: String, path: PathBuf, metadata: &Metadata, single_file_root: bool) -> FileDescriptor {
    FileDescriptor {
        name,
        location: Location::Local(path),
        size: metadata.len(),
        modified: DateTime::<Utc>::from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
        single_file_root,
    }
}

/// `/`-separated path of `path` relative to `root`.
pub(crate) fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Set access and modification time of a local file.
pub fn set_modified(path: &Path, modified: DateTime<Utc>) -> io::Result<()> {
    let time = FileTime::from_system_time(modified.into());
    filetime::set_file_times(path, time, time)
}
