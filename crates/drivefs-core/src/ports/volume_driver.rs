//! Volume driver port (driving/primary port)
//!
//! [`VolumeDriver`] is the capability set a file-manager host consumes.
//! All paths are [`VirtualPath`]s whose segments are remote item IDs.
//!
//! ## Design Notes
//!
//! - Every operation returns a structured [`FsError`] so hosts can branch
//!   on [`FsErrorKind`](crate::domain::FsErrorKind).
//! - Operations a driver cannot perform have default implementations that
//!   report `Unsupported` rather than approximating them.
//! - Path helpers are pure and have default implementations built on the
//!   path codec.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{FsError, FsOp, ItemId, NodeStat, VirtualPath};

/// Streamed file content
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, FsError>>;

/// Filesystem capability set of a mounted volume
#[async_trait]
pub trait VolumeDriver: Send + Sync {
    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Short driver identifier used to prefix host-side hashes
    fn driver_id(&self) -> &str;

    /// Root path of the mounted volume
    fn root(&self) -> &VirtualPath;

    /// Display name of the volume root
    fn root_name(&self) -> &str;

    /// Host commands this driver cannot serve
    fn disabled_commands(&self) -> &[&'static str] {
        &[]
    }

    // ------------------------------------------------------------------
    // Path helpers
    // ------------------------------------------------------------------

    fn dirname(&self, path: &VirtualPath) -> VirtualPath {
        path.parent().unwrap_or_else(VirtualPath::root)
    }

    fn basename(&self, path: &VirtualPath) -> ItemId {
        path.item_id()
    }

    fn join_path(&self, dir: &VirtualPath, id: &ItemId) -> VirtualPath {
        dir.join(id)
    }

    fn normalize_path(&self, raw: &str) -> VirtualPath {
        VirtualPath::new(raw)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Returns the stat record of an item
    async fn stat(&self, path: &VirtualPath) -> Result<NodeStat, FsError>;

    /// Lists a directory; an empty directory yields `Ok(vec![])`
    async fn list(&self, path: &VirtualPath) -> Result<Vec<NodeStat>, FsError>;

    /// Opens a file for reading
    async fn read(&self, path: &VirtualPath) -> Result<ByteStream, FsError>;

    /// Writes `content` as child `name` of directory `path`
    ///
    /// An existing same-named child is overwritten in place. An empty
    /// `name` overwrites the file at `path` itself.
    async fn write(
        &self,
        path: &VirtualPath,
        name: &str,
        content: Vec<u8>,
    ) -> Result<VirtualPath, FsError>;

    /// Creates a directory named `name` inside `parent`
    async fn mkdir(&self, parent: &VirtualPath, name: &str) -> Result<VirtualPath, FsError>;

    /// Moves and/or renames `source` into `target_dir` under `name`
    async fn move_item(
        &self,
        source: &VirtualPath,
        target_dir: &VirtualPath,
        name: &str,
    ) -> Result<VirtualPath, FsError>;

    /// Copies `source` into `target_dir` under `name`
    async fn copy(
        &self,
        source: &VirtualPath,
        target_dir: &VirtualPath,
        name: &str,
    ) -> Result<VirtualPath, FsError>;

    /// Deletes an item; locked items require `force`
    async fn remove(&self, path: &VirtualPath, force: bool) -> Result<bool, FsError>;

    /// Public download URL of a file, `None` if none can be produced
    async fn content_url(&self, path: &VirtualPath) -> Result<Option<String>, FsError>;

    // ------------------------------------------------------------------
    // Unsupported by default
    // ------------------------------------------------------------------

    async fn archive(
        &self,
        dir: &VirtualPath,
        _items: &[VirtualPath],
        _name: &str,
    ) -> Result<VirtualPath, FsError> {
        Err(FsError::unsupported(FsOp::Archive, dir.as_str()))
    }

    async fn extract(&self, path: &VirtualPath) -> Result<VirtualPath, FsError> {
        Err(FsError::unsupported(FsOp::Extract, path.as_str()))
    }

    async fn symlink(
        &self,
        _target: &VirtualPath,
        dir: &VirtualPath,
        _name: &str,
    ) -> Result<VirtualPath, FsError> {
        Err(FsError::unsupported(FsOp::Symlink, dir.as_str()))
    }

    async fn chmod(&self, path: &VirtualPath, _mode: u32) -> Result<NodeStat, FsError> {
        Err(FsError::unsupported(FsOp::Chmod, path.as_str()))
    }
}
