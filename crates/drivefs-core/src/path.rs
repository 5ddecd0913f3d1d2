//! Path codec
//!
//! Pure string functions translating between virtual paths and the
//! `(parent_id, item_id, parent_path)` triple the remote API needs.
//! Every segment of a virtual path is an item ID, so resolving a path
//! never requires a lookup.
//!
//! The codec satisfies `split(join(dir, id)) == (id_of(dir), id, dir)` for
//! every normalized `dir` and separator-free `id`.

/// Path separator
pub const SEPARATOR: char = '/';

/// Item ID the root path resolves to
pub const ROOT_ID: &str = "root";

/// Result of splitting a virtual path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPath {
    /// Item ID of the containing directory (`""` for the root itself)
    pub parent_id: String,
    /// Item ID the path resolves to
    pub item_id: String,
    /// Path of the containing directory (`""` for the root itself)
    pub parent_path: String,
}

/// Splits a path into parent ID, item ID and parent path
///
/// Leading and trailing separators are ignored. An empty path (or `/`)
/// yields `("", "root", "")`.
pub fn split(path: &str) -> SplitPath {
    let mut segments: Vec<&str> = path.split(SEPARATOR).filter(|s| !s.is_empty()).collect();

    let Some(item_id) = segments.pop() else {
        return SplitPath {
            parent_id: String::new(),
            item_id: ROOT_ID.to_string(),
            parent_path: String::new(),
        };
    };

    match segments.last() {
        Some(parent_id) => SplitPath {
            parent_id: (*parent_id).to_string(),
            item_id: item_id.to_string(),
            parent_path: format!("{SEPARATOR}{}", segments.join("/")),
        },
        None => SplitPath {
            parent_id: ROOT_ID.to_string(),
            item_id: item_id.to_string(),
            parent_path: SEPARATOR.to_string(),
        },
    }
}

/// Appends an item ID to a directory path
pub fn join(dir: &str, id: &str) -> String {
    normalize(&format!("{dir}{SEPARATOR}{id}"))
}

/// Normalizes a path to exactly one leading separator
///
/// Repeated and trailing separators are collapsed. `.` and `..` are plain
/// segments and are not resolved.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
        out.push(SEPARATOR);
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push(SEPARATOR);
    }
    out
}

/// Path of the containing directory
pub fn dirname(path: &str) -> String {
    let split = split(path);
    if split.parent_path.is_empty() {
        SEPARATOR.to_string()
    } else {
        split.parent_path
    }
}

/// Last segment of the path (`""` for the root)
pub fn basename(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or_default()
}

/// True if `path` equals `parent` or lies beneath it
pub fn is_within(path: &str, parent: &str) -> bool {
    let path = normalize(path);
    let parent = normalize(parent);
    if parent.len() == 1 {
        return true;
    }
    path == parent
        || path
            .strip_prefix(parent.as_str())
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
}

/// Item ID a directory path resolves to
pub fn id_of(dir: &str) -> String {
    split(dir).item_id
}
