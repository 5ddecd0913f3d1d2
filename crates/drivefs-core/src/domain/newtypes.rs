//! Domain newtypes with validation
//!
//! [`ItemId`] wraps the remote store's opaque item identifier and
//! [`VirtualPath`] the `/`-separated chain of item IDs exposed to callers.
//! Both guarantee their invariants at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use crate::path;

// ============================================================================
// ItemId
// ============================================================================

/// Opaque identifier of a remote item
///
/// Identifiers are stable across renames and moves. The sentinel value
/// [`ItemId::ROOT`] denotes the drive root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Sentinel identifier of the drive root
    pub const ROOT: &'static str = "root";

    /// Creates a validated ItemId
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidItemId` if the value is empty or
    /// contains a path separator.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidItemId("item ID is empty".to_string()));
        }
        if id.contains(path::SEPARATOR) {
            return Err(DomainError::InvalidItemId(format!(
                "item ID contains a separator: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// The drive root
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segments produced by the path codec are already non-empty and
    /// separator-free.
    pub(crate) fn from_segment(segment: &str) -> Self {
        Self(segment.to_string())
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// VirtualPath
// ============================================================================

/// Hierarchical path exposed to the file-manager host
///
/// Every segment after the root is an item ID, never a display name. The
/// inner string is always normalized: exactly one leading separator, no
/// trailing or repeated separators. The root is `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Creates a normalized virtual path
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(path::normalize(raw.as_ref()))
    }

    /// The root path `/`
    #[must_use]
    pub fn root() -> Self {
        Self(path::SEPARATOR.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Item ID this path resolves to (`root` for `/`)
    #[must_use]
    pub fn item_id(&self) -> ItemId {
        match path::basename(&self.0) {
            "" => ItemId::root(),
            segment => ItemId::from_segment(segment),
        }
    }

    /// Item ID of the containing directory, `None` for the root
    #[must_use]
    pub fn parent_id(&self) -> Option<ItemId> {
        if self.is_root() {
            return None;
        }
        let split = path::split(&self.0);
        Some(ItemId::from_segment(&split.parent_id))
    }

    /// Path of the containing directory, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<VirtualPath> {
        if self.is_root() {
            return None;
        }
        Some(Self(path::dirname(&self.0)))
    }

    /// Appends a child item ID
    #[must_use]
    pub fn join(&self, id: &ItemId) -> VirtualPath {
        Self(path::join(&self.0, id.as_str()))
    }

    /// True if this path equals `ancestor` or lies beneath it
    #[must_use]
    pub fn is_within(&self, ancestor: &VirtualPath) -> bool {
        path::is_within(&self.0, &ancestor.0)
    }

    /// Item IDs from the root down to this item (empty for the root)
    pub fn segments(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0
            .split(path::SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(ItemId::from_segment)
    }
}

impl Default for VirtualPath {
    fn default() -> Self {
        Self::root()
    }
}

impl Display for VirtualPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VirtualPath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for VirtualPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<VirtualPath> for String {
    fn from(path: VirtualPath) -> Self {
        path.0
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
