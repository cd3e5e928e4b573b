//! Change detection between the two listings of a sync.
//!
//! The destination listing is drained into a map first; the source listing
//! is then streamed against it. Only size and modification time are
//! compared.

use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::fs::{FileDescriptor, Listing};

/// Buffer between the diff task and the dispatcher.
const OPERATION_BUFFER: usize = 256;

/// What to do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Copy the source file over the destination.
    Update,
    /// Remove the destination file.
    Delete,
}

/// One unit of work for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOperation {
    /// Source descriptor for updates, destination descriptor for deletes.
    pub file: FileDescriptor,
    pub kind: OperationKind,
}

impl SyncOperation {
    pub fn update(file: FileDescriptor) -> Self {
        Self {
            file,
            kind: OperationKind::Update,
        }
    }

    pub fn delete(file: FileDescriptor) -> Self {
        Self {
            file,
            kind: OperationKind::Delete,
        }
    }
}

/// A job as produced by the diff: an operation or a listing error to report.
pub type Job = Result<SyncOperation>;

/// Stream of jobs produced by [`plan`].
pub type Operations = mpsc::Receiver<Job>;

#[derive(Debug)]
struct DestinationEntry {
    file: FileDescriptor,
    exists_in_source: bool,
}

/// Stateful comparison of source files against a destination snapshot.
#[derive(Debug, Default)]
pub struct Differ {
    destination: HashMap<String, DestinationEntry>,
    /// Name of the destination entry when the destination root is one file.
    single_file_root: Option<String>,
}

/// True when the destination copy is missing or stale.
///
/// A size mismatch always updates; otherwise only a strictly newer source
/// does. Equal size and equal time is considered in sync.
pub fn needs_update(source: &FileDescriptor, dest: Option<&FileDescriptor>) -> bool {
    match dest {
        None => true,
        Some(dest) => source.size != dest.size || source.modified > dest.modified,
    }
}

impl Differ {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one destination file to the snapshot.
    pub fn insert_destination(&mut self, file: FileDescriptor) {
        if file.single_file_root {
            self.single_file_root = Some(file.name.clone());
        }
        self.destination.insert(
            file.name.clone(),
            DestinationEntry {
                file,
                exists_in_source: false,
            },
        );
    }

    pub fn destination_len(&self) -> usize {
        self.destination.len()
    }

    /// Compare one source file, returning the update it needs if any.
    pub fn compare(&mut self, source: FileDescriptor) -> Option<SyncOperation> {
        let key = if !self.destination.contains_key(&source.name) && source.single_file_root {
            // A single source file synced onto a single destination file is
            // compared with it even when the base names differ.
            self.single_file_root.clone().unwrap_or_else(|| source.name.clone())
        } else {
            source.name.clone()
        };

        let entry = self.destination.get_mut(&key);
        let update = needs_update(&source, entry.as_ref().map(|e| &e.file));
        if let Some(entry) = entry {
            entry.exists_in_source = true;
        }

        if update {
            Some(SyncOperation::update(source))
        } else {
            None
        }
    }

    /// Delete operations for destination files never seen in the source.
    pub fn extraneous(self) -> impl Iterator<Item = SyncOperation> {
        self.destination
            .into_values()
            .filter(|entry| !entry.exists_in_source)
            .map(|entry| SyncOperation::delete(entry.file))
    }
}

/// Diff two listings into a stream of jobs.
///
/// Waits for the destination listing to finish and fails with its first
/// error. The source listing is then consumed on a background task; its
/// errors are forwarded as `Err` jobs. When `delete` is set, deletions for
/// extraneous destination files follow the last update, unless the source
/// listing reported an error.
pub async fn plan(mut destination: Listing, mut source: Listing, delete: bool) -> Result<Operations> {
    let mut differ = Differ::new();
    while let Some(entry) = destination.recv().await {
        differ.insert_destination(entry?);
    }
    debug!(files = differ.destination_len(), "destination listing complete");

    let (sender, receiver) = mpsc::channel(OPERATION_BUFFER);

    tokio::spawn(async move {
        let mut source_failed = false;
        let mut updates = 0usize;

        while let Some(entry) = source.recv().await {
            let job = match entry {
                Ok(file) => match differ.compare(file) {
                    Some(op) => {
                        updates += 1;
                        Ok(op)
                    }
                    None => continue,
                },
                Err(err) => {
                    source_failed = true;
                    Err(err)
                }
            };
            if sender.send(job).await.is_err() {
                return;
            }
        }
        debug!(updates, "source listing complete");

        if !delete {
            return;
        }
        if source_failed {
            warn!("source listing failed, not deleting extraneous destination files");
            return;
        }
        for op in differ.extraneous() {
            if sender.send(Ok(op)).await.is_err() {
                return;
            }
        }
    });

    Ok(receiver)
}

/// Drain a job stream; handy for inspecting a plan without executing it.
pub async fn collect(mut operations: Operations) -> Vec<Job> {
    let mut jobs = Vec::new();
    while let Some(job) = operations.recv().await {
        jobs.push(job);
    }
    jobs
}
