//! Helpers for normalizing workdir-relative paths.
//!
//! Every path the selector sees is `/`-separated and relative to the working
//! directory, so ownership rules and changed files compare as plain strings.

/// Normalize a relative path: backslashes become `/`, leading `./` and
/// repeated or trailing separators are dropped.
///
/// Returns `None` for paths that are empty after normalization.
pub fn normalize_relative(raw: &str) -> Option<String> {
    let replaced = raw.trim().replace('\\', "/");
    let segments: Vec<&str> = replaced
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Split a normalized path into its segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// True if `path` equals `dir` or lies beneath it.
pub fn is_within(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return true;
    }
    match path.strip_prefix(dir) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}
