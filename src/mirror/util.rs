use chrono::{DateTime, Local};
use std::path::Path;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a local time the way every persisted document stores it.
///
/// This is the single, canonical timestamp format for ledger entries and
/// audit events.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Rewrite Windows separators so every matcher works on `/`.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

pub fn path_string(path: &Path) -> String {
    normalize_separators(&path.to_string_lossy())
}

pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
