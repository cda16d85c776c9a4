//! Per-recipient `since` watermark kept next to the marker directory.

use std::io;
use std::path::{Path, PathBuf};

use relay_types::{Message, marker};

pub fn watermark_path(relay_dir: &Path, name: &str) -> PathBuf {
    relay_dir.join(format!("{name}{}", marker::LAST_ID_SUFFIX))
}

/// Last consumed id. A missing or unreadable-as-number file reads as 0.
pub fn read_last_id(path: &Path) -> io::Result<i64> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(data.trim().parse().unwrap_or(0)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

pub fn write_last_id(path: &Path, id: i64) -> io::Result<()> {
    std::fs::write(path, id.to_string())
}

pub fn highest_id(messages: &[Message]) -> Option<i64> {
    messages.iter().map(|m| m.id).max()
}

/// The last `limit` messages, or all of them when `limit` is 0.
pub fn limit_messages(messages: &[Message], limit: usize) -> &[Message] {
    if limit == 0 || messages.len() <= limit {
        messages
    } else {
        &messages[messages.len() - limit..]
    }
}
