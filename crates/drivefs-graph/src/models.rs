//! OneDrive API response and request types
//!
//! Maps the JSON structures of the items API. Only the facets drivefs
//! consumes are modelled; unknown fields are ignored.
//!
//! See: <https://learn.microsoft.com/en-us/onedrive/developer/rest-api/resources/driveitem>

use chrono::{DateTime, Utc};
use drivefs_core::domain::ItemId;
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// DriveItem
// ============================================================================

/// A remote file or folder
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Unique identifier of the item within the drive
    pub id: String,

    /// Name of the item (filename or folder name)
    #[serde(default)]
    pub name: String,

    /// Size in bytes
    pub size: Option<u64>,

    pub last_modified_date_time: Option<DateTime<Utc>>,

    /// Present if the item is a folder
    pub folder: Option<FolderFacet>,

    /// Present if the item is a file
    pub file: Option<FileFacet>,

    /// Present if the item is an image
    pub image: Option<ImageFacet>,

    /// Thumbnail sets, present when expanded
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailSet>,

    pub parent_reference: Option<ItemReference>,

    pub web_url: Option<String>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    /// Folder child count, if reported
    pub fn child_count(&self) -> Option<u64> {
        self.folder.as_ref().and_then(|f| f.child_count)
    }

    /// MIME type reported by the server
    pub fn mime_type(&self) -> Option<&str> {
        self.file.as_ref().and_then(|f| f.mime_type.as_deref())
    }

    /// URL of the small thumbnail of the first thumbnail set
    pub fn small_thumbnail_url(&self) -> Option<&str> {
        self.thumbnails
            .first()
            .and_then(|set| set.small.as_ref())
            .and_then(|t| t.url.as_deref())
    }
}

/// Folder facet
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    pub child_count: Option<u64>,
}

/// File facet
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    pub mime_type: Option<String>,
}

/// Image facet
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageFacet {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One set of thumbnails in several sizes
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThumbnailSet {
    pub small: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub large: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Thumbnail {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Reference to a parent item, by ID or by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ItemReference {
    /// Reference used as copy/move destination
    ///
    /// The drive root is addressed by path, every other folder by ID.
    pub fn to_folder(id: &ItemId) -> Self {
        if id.is_root() {
            Self {
                id: None,
                path: Some("/drive/root:".to_string()),
            }
        } else {
            Self {
                id: Some(id.to_string()),
                path: None,
            }
        }
    }
}

// ============================================================================
// Collections
// ============================================================================

/// One page of a children listing
#[derive(Debug, Deserialize)]
pub struct ChildrenPage {
    #[serde(default)]
    pub value: Vec<DriveItem>,

    /// URL of the next page, absent on the last page
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of a PATCH on an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<ItemReference>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent_reference.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewFolder<'a> {
    pub name: &'a str,
    pub folder: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CopyRequest<'a> {
    pub name: &'a str,
    pub parent_reference: &'a ItemReference,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateLinkRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub scope: &'a str,
}

// ============================================================================
// Responses of actions
// ============================================================================

/// Permission returned by `action.createLink`
#[derive(Debug, Deserialize)]
pub struct Permission {
    pub link: Option<SharingLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingLink {
    pub web_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Body returned by an asynchronous operation monitor
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub status: Option<String>,
    pub resource_id: Option<String>,
    pub id: Option<String>,
    pub percentage_complete: Option<f64>,
}

/// Error payload `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Query options
// ============================================================================

/// Field selection and filtering appended to item requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub select: Vec<String>,
    pub expand: Option<String>,
    pub filter: Option<String>,
    pub top: Option<u32>,
}

/// Fields needed to build a stat record
const STAT_FIELDS: &[&str] = &[
    "id",
    "name",
    "lastModifiedDateTime",
    "file",
    "folder",
    "size",
    "image",
];

impl QueryOptions {
    /// Options for directory listings and stat lookups
    pub fn stat_fields(with_thumbnails: bool) -> Self {
        Self {
            select: STAT_FIELDS.iter().map(|s| s.to_string()).collect(),
            expand: with_thumbnails.then(|| "thumbnails(select=small)".to_string()),
            ..Self::default()
        }
    }

    /// Single-row probe for child folders
    pub fn subfolder_probe() -> Self {
        Self {
            select: vec!["id".to_string()],
            filter: Some("folder ne null".to_string()),
            top: Some(1),
            ..Self::default()
        }
    }

    /// Only the item ID
    pub fn id_only() -> Self {
        Self {
            select: vec!["id".to_string()],
            ..Self::default()
        }
    }

    /// Appends the options as query parameters
    pub fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        if let Some(top) = self.top {
            pairs.append_pair("top", &top.to_string());
        }
        if !self.select.is_empty() {
            pairs.append_pair("select", &self.select.join(","));
        }
        if let Some(expand) = &self.expand {
            pairs.append_pair("expand", expand);
        }
        if let Some(filter) = &self.filter {
            pairs.append_pair("filter", filter);
        }
        drop(pairs);
        if url.query() == Some("") {
            url.set_query(None);
        }
    }
}
