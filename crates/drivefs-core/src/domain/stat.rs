//! Stat record of a remote item
//!
//! [`NodeStat`] is a read-only projection of a remote item as the
//! file-manager host sees it. It is rebuilt on every fetch and never
//! mutated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::ItemId;

/// MIME type reported for directories
pub const DIRECTORY_MIME: &str = "directory";

/// Projection of a remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStat {
    /// Remote item identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// `"directory"` or a MIME type
    pub mime: String,
    /// Size in bytes (files only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Thumbnail reference (remote URL or local thumbnail file name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Whether the directory has child directories; `None` when unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_subdirs: Option<bool>,
    /// Whether file content can be fetched through the driver
    #[serde(default)]
    pub content_accessible: bool,
    /// Direct URL, when one is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Matches one of the volume's locked name patterns
    #[serde(default)]
    pub locked: bool,
}

impl NodeStat {
    /// Creates a directory stat
    pub fn directory(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mime: DIRECTORY_MIME.to_string(),
            size: None,
            modified: None,
            width: None,
            height: None,
            thumbnail: None,
            has_subdirs: None,
            content_accessible: false,
            url: None,
            locked: false,
        }
    }

    /// Creates a file stat
    pub fn file(id: ItemId, name: impl Into<String>, mime: impl Into<String>, size: u64) -> Self {
        Self {
            mime: mime.into(),
            size: Some(size),
            content_accessible: true,
            ..Self::directory(id, name)
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mime == DIRECTORY_MIME
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    /// Image dimensions formatted as `"WxH"`
    #[must_use]
    pub fn dimensions(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        }
    }

    /// Modification time as a Unix timestamp (0 when unknown)
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.modified.map(|t| t.timestamp()).unwrap_or(0)
    }
}
