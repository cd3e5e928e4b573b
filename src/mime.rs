//! Content type detection for uploads.

use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{Result, SyncError};

/// Bytes inspected when sniffing a file.
const SNIFF_LEN: usize = 8192;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess the content type of a local file from its first bytes.
pub async fn detect_content_type(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| SyncError::io(e, "opening", path))?;

    let mut buf = Vec::with_capacity(SNIFF_LEN);
    (&mut file)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| SyncError::io(e, "reading", path))?;

    Ok(sniff(&buf).to_string())
}

/// Content type of a byte prefix.
pub fn sniff(buf: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(buf) {
        return kind.mime_type();
    }
    if is_text(buf) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn is_text(buf: &[u8]) -> bool {
    match std::str::from_utf8(buf) {
        Ok(text) => !text.contains('\0'),
        // A multi-byte character cut off at the end of the sniffed prefix
        Err(err) => err.error_len().is_none() && !buf[..err.valid_up_to()].contains(&0),
    }
}
