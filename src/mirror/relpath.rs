//! Project-root markers and the relative-path key derived from them.

use crate::mirror::util::normalize_separators;
use regex::Regex;
use std::sync::OnceLock;

/// Known project-root markers, in priority order.
pub const PROJECT_ROOT_MARKERS: &[&str] = &[
    "var/www/",
    "www/",
    "public_html/",
    "local/",
    "htdocs/",
    "home/",
];

fn temp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Temp/[^/]+/(.+)").expect("valid temp regex"))
}

/// Separator-normalized path with `.`, `..` and empty segments resolved lexically.
fn clean_path(file_path: &str) -> String {
    let normalized = normalize_separators(file_path);
    let mut parts: Vec<&str> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if normalized.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// First marker in list order that occurs in the (normalized) path.
fn first_marker(normalized: &str) -> Option<(&'static str, usize)> {
    PROJECT_ROOT_MARKERS
        .iter()
        .find_map(|marker| normalized.find(marker).map(|idx| (*marker, idx)))
}

/// Path prefix up to and including the first matching marker.
pub fn project_root(file_path: &str) -> Option<String> {
    let normalized = clean_path(file_path);
    let (marker, idx) = first_marker(&normalized)?;
    Some(normalized[..idx + marker.len()].to_string())
}

/// Ledger key for a file: lossy, two absolute paths can share it.
///
/// Never contains `.` or `..` segments, so joining it onto a backup
/// directory stays inside that directory.
pub fn relative_path(file_path: &str) -> String {
    let normalized = clean_path(file_path);
    if let Some((marker, idx)) = first_marker(&normalized) {
        return normalized[idx + marker.len()..].to_string();
    }
    if let Some(caps) = temp_pattern().captures(&normalized) {
        return caps[1].to_string();
    }
    normalized
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
