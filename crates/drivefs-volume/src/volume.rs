//! OneDrive volume driver
//!
//! [`Volume`] implements [`VolumeDriver`] on top of the items API. Paths
//! are chains of item IDs, so resolving a path never costs a request: the
//! last segment is the item and the one before it is the parent.
//!
//! Every mutation invalidates the directory listings it affects before it
//! returns, so a `list` issued right after observes the change.

use std::sync::Arc;

use async_trait::async_trait;
use drivefs_core::config::Config;
use drivefs_core::domain::{FsError, FsErrorKind, FsOp, ItemId, NodeStat, VirtualPath};
use drivefs_core::ports::{
    ByteStream, CopyThumbnailProcessor, ExtensionMimeDetector, MimeDetector, ThumbnailProcessor,
    ThumbnailSpec, VolumeDriver,
};
use drivefs_graph::client::{ApiClient, UploadTarget};
use drivefs_graph::models::{DriveItem, ItemPatch, ItemReference};
use drivefs_graph::operation::{OperationStatus, PollPolicy};
use drivefs_graph::GraphError;
use futures_util::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{DirectoryCache, StatMapper};
use crate::error::{from_graph, GraphResultExt};
use crate::thumbnails::ThumbnailCache;

/// Driver identifier, also the thumbnail name prefix
pub const DRIVER_ID: &str = "od";

/// Display name of the drive root in [`Volume::root_folders`]
pub const DRIVE_ROOT_NAME: &str = "My OneDrive";

const DISABLED_COMMANDS: &[&str] = &["archive", "extract"];

const DOWNLOAD_URL: &str = "https://onedrive.live.com/download.aspx";

/// Pluggable helpers of a volume
pub struct Collaborators {
    pub mime: Arc<dyn MimeDetector>,
    pub thumbnails: Arc<dyn ThumbnailProcessor>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            mime: Arc::new(ExtensionMimeDetector),
            thumbnails: Arc::new(CopyThumbnailProcessor),
        }
    }
}

/// A mounted OneDrive folder
pub struct Volume {
    client: Arc<ApiClient>,
    cache: DirectoryCache,
    thumbnails: Option<Arc<ThumbnailCache>>,
    root: VirtualPath,
    root_name: String,
    copy_join: bool,
    check_name_collision: bool,
    poll: PollPolicy,
    cancel: CancellationToken,
}

impl Volume {
    /// Mounts the folder configured in `config.volume`
    ///
    /// Fails with [`FsErrorKind::Auth`] when no usable token can be
    /// obtained; nothing else is attempted in that case.
    pub async fn mount(
        client: Arc<ApiClient>,
        config: &Config,
        collaborators: Collaborators,
    ) -> Result<Self, FsError> {
        let volume = &config.volume;
        let root = resolve_root(&volume.path);

        client.tokens().ensure_valid().await.map_err(|e| {
            FsError::new(FsErrorKind::Auth, FsOp::Mount, root.as_str(), e.to_string())
                .with_source(e)
        })?;

        let mapper = StatMapper::new(
            collaborators.mime,
            volume.locked_patterns(),
            volume.use_api_thumbnail,
        );
        let cache = DirectoryCache::new(Arc::clone(&client), mapper);

        let root_name = match volume.alias.as_deref() {
            Some(alias) if !alias.trim().is_empty() => alias.to_string(),
            _ if root.is_root() => volume.root_name.clone(),
            _ => {
                let stat = cache.get_stat(&root).await.for_op(FsOp::Mount, &root)?;
                if !stat.is_dir() {
                    return Err(FsError::new(
                        FsErrorKind::InvalidInput,
                        FsOp::Mount,
                        root.as_str(),
                        "volume root is not a folder",
                    ));
                }
                format!("{}@OneDrive", stat.name)
            }
        };

        let thumbnails = volume.tmb_dir.clone().map(|dir| {
            let spec = ThumbnailSpec {
                size: volume.tmb_size,
                crop: volume.tmb_crop,
                background: volume.tmb_bg_color.clone(),
            };
            let mount_key = format!("{}{}", client.base_url(), root);
            Arc::new(ThumbnailCache::new(
                dir,
                DRIVER_ID,
                &mount_key,
                spec,
                collaborators.thumbnails,
            ))
        });

        info!(root = %root, name = %root_name, "Mounted volume");

        Ok(Self {
            client,
            cache,
            thumbnails,
            root,
            root_name,
            copy_join: volume.copy_join,
            check_name_collision: volume.check_name_collision,
            poll: PollPolicy::from_config(&config.polling),
            cancel: CancellationToken::new(),
        })
    }

    pub fn cache(&self) -> &DirectoryCache {
        &self.cache
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Cancels running copies, drops cached listings and purges thumbnails
    pub fn unmount(&self) -> usize {
        self.cancel.cancel();
        self.cache.clear();

        let purged = match &self.thumbnails {
            Some(tmb) => tmb.purge().unwrap_or_else(|e| {
                warn!(dir = %tmb.dir().display(), error = %e, "Failed to purge thumbnails");
                0
            }),
            None => 0,
        };

        info!(root = %self.root, purged, "Unmounted volume");
        purged
    }

    // ========================================================================
    // Extra operations
    // ========================================================================

    /// Creates an empty file
    pub async fn mkfile(&self, dir: &VirtualPath, name: &str) -> Result<VirtualPath, FsError> {
        self.write(dir, name, Vec::new()).await
    }

    /// Whole content of a file
    pub async fn get_contents(&self, path: &VirtualPath) -> Result<Vec<u8>, FsError> {
        self.read(path).await?.try_concat().await
    }

    /// Replaces the content of an existing file
    pub async fn put_contents(
        &self,
        path: &VirtualPath,
        content: Vec<u8>,
    ) -> Result<NodeStat, FsError> {
        self.ensure_within(FsOp::Write, path)?;
        let item = self.overwrite(path, content).await?;
        self.cache.mapper().to_stat(&item).ok_or_else(|| missing_id(FsOp::Write, path))
    }

    /// `"WxH"` for images with known dimensions
    pub async fn dimensions(&self, path: &VirtualPath) -> Result<Option<String>, FsError> {
        Ok(self.stat(path).await?.dimensions())
    }

    pub async fn has_subdirs(&self, dir: &VirtualPath) -> Result<bool, FsError> {
        self.ensure_within(FsOp::List, dir)?;
        self.cache.has_subdirs(dir).await.for_op(FsOp::List, dir)
    }

    /// True if `dir` has a child called `name` (case-insensitive)
    pub async fn name_exists(&self, dir: &VirtualPath, name: &str) -> Result<bool, FsError> {
        self.ensure_within(FsOp::Stat, dir)?;
        Ok(self
            .child_named(dir, name)
            .await
            .for_op(FsOp::Stat, dir)?
            .is_some())
    }

    /// Mount picker listing: the drive root, then its folders by name
    pub async fn root_folders(&self) -> Result<Vec<NodeStat>, FsError> {
        let drive_root = VirtualPath::root();
        let listing = self
            .cache
            .list_children(&drive_root)
            .await
            .for_op(FsOp::List, &drive_root)?;

        let mut folders: Vec<NodeStat> = listing
            .ordered_stats()
            .into_iter()
            .filter(NodeStat::is_dir)
            .collect();
        folders.sort_by_cached_key(|s| s.name.to_lowercase());

        let mut all = Vec::with_capacity(folders.len() + 1);
        all.push(NodeStat::directory(ItemId::root(), DRIVE_ROOT_NAME));
        all.extend(folders);
        Ok(all)
    }

    /// File name of the local thumbnail of an image, created on demand
    ///
    /// `None` when thumbnails are disabled, the item is not an image, or
    /// the thumbnail could not be produced.
    pub async fn thumbnail(&self, path: &VirtualPath) -> Result<Option<String>, FsError> {
        let Some(tmb) = &self.thumbnails else {
            return Ok(None);
        };
        self.ensure_within(FsOp::Thumbnail, path)?;

        let stat = self.cache.get_stat(path).await.for_op(FsOp::Thumbnail, path)?;
        if !stat.is_image() {
            return Ok(None);
        }
        if let Some(name) = tmb.existing(&stat) {
            return Ok(Some(name));
        }

        let source = self
            .client
            .thumbnail(&stat.id)
            .await
            .for_op(FsOp::Thumbnail, path)?;
        // Image processing and file writes stay off the runtime threads
        let thumbs = Arc::clone(tmb);
        let created = tokio::task::spawn_blocking(move || thumbs.create(&stat, &source)).await;
        match created {
            Ok(Ok(name)) => Ok(Some(name)),
            Ok(Err(e)) => {
                warn!(path = %path, error = ?e, "Thumbnail creation failed");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Thumbnail task failed");
                Ok(None)
            }
        }
    }

    /// Copies with a caller-supplied cancellation token
    ///
    /// Unmounting also cancels the wait.
    pub async fn copy_cancellable(
        &self,
        source: &VirtualPath,
        target_dir: &VirtualPath,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<VirtualPath, FsError> {
        self.ensure_within(FsOp::Copy, source)?;
        self.ensure_within(FsOp::Copy, target_dir)?;
        validate_name(FsOp::Copy, target_dir, name)?;

        let source_id = source.item_id();

        if self.copy_join {
            if let Some(existing) = self
                .child_named(target_dir, name)
                .await
                .for_op(FsOp::Copy, target_dir)?
            {
                if existing == source_id {
                    return Err(FsError::new(
                        FsErrorKind::InvalidInput,
                        FsOp::Copy,
                        source.as_str(),
                        "cannot copy an item onto itself",
                    ));
                }
                debug!(target = %target_dir, name, existing = %existing, "Removing copy destination");
                self.evict_thumbnail(&target_dir.join(&existing)).await;
                self.client
                    .delete_item(&existing)
                    .await
                    .for_op(FsOp::Copy, target_dir)?;
                self.cache.invalidate(target_dir);
                self.cache.invalidate_tree(&target_dir.join(&existing));
            }
        }

        let operation = self
            .client
            .submit_copy(
                &source_id,
                name,
                &ItemReference::to_folder(&target_dir.item_id()),
            )
            .await
            .for_op(FsOp::Copy, source)?;

        let linked = self.linked_token(cancel);
        let _release = linked.clone().drop_guard();
        let done = self.client.poll(operation, &self.poll, &linked).await;
        self.cache.invalidate(target_dir);

        match done.status() {
            OperationStatus::Succeeded { resource_id } => {
                let id = ItemId::new(resource_id.as_str()).map_err(|e| {
                    FsError::new(FsErrorKind::Api, FsOp::Copy, source.as_str(), e.to_string())
                })?;
                info!(source = %source, target = %target_dir, id = %id, "Copied item");
                Ok(target_dir.join(&id))
            }
            OperationStatus::Failed(reason) => Err(FsError::new(
                FsErrorKind::AsyncOpFailed,
                FsOp::Copy,
                source.as_str(),
                format!("copy failed: {reason}"),
            )),
            OperationStatus::Pending => Err(FsError::new(
                FsErrorKind::AsyncOpFailed,
                FsOp::Copy,
                source.as_str(),
                "copy did not finish",
            )),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn ensure_within(&self, op: FsOp, path: &VirtualPath) -> Result<(), FsError> {
        if path.is_within(&self.root) {
            Ok(())
        } else {
            Err(FsError::new(
                FsErrorKind::InvalidInput,
                op,
                path.as_str(),
                "path is outside the volume",
            ))
        }
    }

    /// Token cancelled on unmount or when `caller` is cancelled
    ///
    /// Cancelling the returned token releases the watcher task.
    fn linked_token(&self, caller: &CancellationToken) -> CancellationToken {
        let linked = self.cancel.child_token();
        let watcher = linked.clone();
        let caller = caller.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = caller.cancelled() => watcher.cancel(),
                _ = watcher.cancelled() => {}
            }
        });
        linked
    }

    /// Drops the cached thumbnail of the item at `path`, if any
    ///
    /// Must run before the item is deleted: the file name needs its stat.
    async fn evict_thumbnail(&self, path: &VirtualPath) {
        let Some(tmb) = &self.thumbnails else {
            return;
        };
        match self.cache.get_stat(path).await {
            Ok(stat) => {
                tmb.evict(&stat);
            }
            Err(e) => debug!(path = %path, error = %e, "No stat, thumbnail left in place"),
        }
    }

        /// ID of the child of `dir` called `name`
    ///
    /// Answered from the cached listing when there is one.
    async fn child_named(&self, dir: &VirtualPath, name: &str) -> Result<Option<ItemId>, GraphError> {
        if let Some(listing) = self.cache.cached(dir) {
            return Ok(listing.find_by_name(name).map(VirtualPath::item_id));
        }
        let found = self.client.find_child(&dir.item_id(), name).await?;
        Ok(found.and_then(|item| ItemId::new(item.id).ok()))
    }

    /// Uploads over the file at `path` and invalidates its directory
    async fn overwrite(&self, path: &VirtualPath, content: Vec<u8>) -> Result<DriveItem, FsError> {
        if path == &self.root {
            return Err(FsError::new(
                FsErrorKind::InvalidInput,
                FsOp::Write,
                path.as_str(),
                "cannot write content to the volume root",
            ));
        }

        let id = path.item_id();
        let item = self
            .client
            .upload(UploadTarget::Item(&id), content)
            .await
            .for_op(FsOp::Write, path)?;
        self.cache.invalidate(&self.dirname(path));
        Ok(item)
    }
}

#[async_trait]
impl VolumeDriver for Volume {
    fn driver_id(&self) -> &str {
        DRIVER_ID
    }

    fn root(&self) -> &VirtualPath {
        &self.root
    }

    fn root_name(&self) -> &str {
        &self.root_name
    }

    fn disabled_commands(&self) -> &[&'static str] {
        DISABLED_COMMANDS
    }

    async fn stat(&self, path: &VirtualPath) -> Result<NodeStat, FsError> {
        self.ensure_within(FsOp::Stat, path)?;
        let mut stat = self.cache.get_stat(path).await.for_op(FsOp::Stat, path)?;
        if path == &self.root {
            stat.name = self.root_name.clone();
        }
        Ok(stat)
    }

    async fn list(&self, path: &VirtualPath) -> Result<Vec<NodeStat>, FsError> {
        self.ensure_within(FsOp::List, path)?;
        let listing = self
            .cache
            .list_children(path)
            .await
            .for_op(FsOp::List, path)?;
        Ok(listing.ordered_stats())
    }

    async fn read(&self, path: &VirtualPath) -> Result<ByteStream, FsError> {
        self.ensure_within(FsOp::Read, path)?;
        let stream = self
            .client
            .download(&path.item_id())
            .await
            .for_op(FsOp::Read, path)?;

        let path = path.clone();
        Ok(stream
            .map(move |chunk| chunk.map_err(|e| from_graph(FsOp::Read, &path, e)))
            .boxed())
    }

    async fn write(
        &self,
        path: &VirtualPath,
        name: &str,
        content: Vec<u8>,
    ) -> Result<VirtualPath, FsError> {
        self.ensure_within(FsOp::Write, path)?;

        if name.is_empty() {
            self.overwrite(path, content).await?;
            return Ok(path.clone());
        }
        validate_name(FsOp::Write, path, name)?;

        let size = content.len();
        let existing = self
            .child_named(path, name)
            .await
            .for_op(FsOp::Write, path)?;
        let parent = path.item_id();
        let target = match &existing {
            Some(id) => UploadTarget::Item(id),
            None => UploadTarget::Child {
                parent: &parent,
                name,
            },
        };

        let item = self
            .client
            .upload(target, content)
            .await
            .for_op(FsOp::Write, path)?;
        self.cache.invalidate(path);

        let id = ItemId::new(item.id).map_err(|_| missing_id(FsOp::Write, path))?;
        debug!(dir = %path, name, size, replaced = existing.is_some(), "Wrote file");
        Ok(path.join(&id))
    }

    async fn mkdir(&self, parent: &VirtualPath, name: &str) -> Result<VirtualPath, FsError> {
        self.ensure_within(FsOp::Mkdir, parent)?;
        validate_name(FsOp::Mkdir, parent, name)?;

        if self.check_name_collision
            && self
                .child_named(parent, name)
                .await
                .for_op(FsOp::Mkdir, parent)?
                .is_some()
        {
            return Err(FsError::already_exists(FsOp::Mkdir, parent.as_str(), name));
        }

        let item = self
            .client
            .create_folder(&parent.item_id(), name)
            .await
            .for_op(FsOp::Mkdir, parent)?;
        self.cache.invalidate(parent);

        let id = ItemId::new(item.id).map_err(|_| missing_id(FsOp::Mkdir, parent))?;
        debug!(parent = %parent, name, id = %id, "Created folder");
        Ok(parent.join(&id))
    }

    async fn move_item(
        &self,
        source: &VirtualPath,
        target_dir: &VirtualPath,
        name: &str,
    ) -> Result<VirtualPath, FsError> {
        self.ensure_within(FsOp::Move, source)?;
        self.ensure_within(FsOp::Move, target_dir)?;
        validate_name(FsOp::Move, target_dir, name)?;
        if source == &self.root {
            return Err(FsError::new(
                FsErrorKind::InvalidInput,
                FsOp::Move,
                source.as_str(),
                "cannot move the volume root",
            ));
        }
        if target_dir.is_within(source) {
            return Err(FsError::new(
                FsErrorKind::InvalidInput,
                FsOp::Move,
                source.as_str(),
                "cannot move a folder into itself",
            ));
        }

        let stat = self.cache.get_stat(source).await.for_op(FsOp::Move, source)?;
        let source_dir = self.dirname(source);

        let patch = ItemPatch {
            name: (stat.name != name).then(|| name.to_string()),
            parent_reference: (&source_dir != target_dir)
                .then(|| ItemReference::to_folder(&target_dir.item_id())),
        };
        let moved = target_dir.join(&stat.id);
        if patch.is_empty() {
            return Ok(moved);
        }

        self.client
            .update_item(&stat.id, &patch)
            .await
            .for_op(FsOp::Move, source)?;

        self.cache.invalidate(&source_dir);
        self.cache.invalidate(target_dir);
        self.cache.invalidate_tree(source);

        debug!(source = %source, target = %moved, "Moved item");
        Ok(moved)
    }

    async fn copy(
        &self,
        source: &VirtualPath,
        target_dir: &VirtualPath,
        name: &str,
    ) -> Result<VirtualPath, FsError> {
        self.copy_cancellable(source, target_dir, name, &self.cancel)
            .await
    }

    async fn remove(&self, path: &VirtualPath, force: bool) -> Result<bool, FsError> {
        self.ensure_within(FsOp::Remove, path)?;
        if path == &self.root {
            return Err(FsError::new(
                FsErrorKind::InvalidInput,
                FsOp::Remove,
                path.as_str(),
                "cannot remove the volume root",
            ));
        }

        let stat = self.cache.get_stat(path).await.for_op(FsOp::Remove, path)?;
        if stat.locked && !force {
            return Err(FsError::locked(FsOp::Remove, path.as_str()));
        }

        let removed = match self.client.delete_item(&stat.id).await {
            Ok(()) => true,
            // Already gone remotely
            Err(GraphError::NotFound(_)) => false,
            Err(e) => return Err(from_graph(FsOp::Remove, path, e)),
        };

        self.cache.invalidate(&self.dirname(path));
        self.cache.invalidate_tree(path);
        if let Some(tmb) = &self.thumbnails {
            tmb.evict(&stat);
        }

        debug!(path = %path, removed, "Removed item");
        Ok(removed)
    }

    async fn content_url(&self, path: &VirtualPath) -> Result<Option<String>, FsError> {
        self.ensure_within(FsOp::ContentUrl, path)?;
        let stat = self
            .cache
            .get_stat(path)
            .await
            .for_op(FsOp::ContentUrl, path)?;
        if stat.is_dir() {
            return Ok(None);
        }
        if let Some(url) = stat.url {
            return Ok(Some(url));
        }

        let link = self
            .client
            .create_share_link(&stat.id)
            .await
            .for_op(FsOp::ContentUrl, path)?;
        Ok(link.as_deref().and_then(download_url))
    }
}

/// Volume root from its configured path; `root` and `/` both mean the drive root
fn resolve_root(raw: &str) -> VirtualPath {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() || trimmed == ItemId::ROOT {
        VirtualPath::root()
    } else {
        VirtualPath::new(raw.trim())
    }
}

/// Rewrites a share link into a direct download URL
fn download_url(web_url: &str) -> Option<String> {
    match web_url.split_once('?') {
        Some((_, query)) if !query.is_empty() => Some(format!("{DOWNLOAD_URL}?{query}")),
        _ => None,
    }
}

fn validate_name(op: FsOp, path: &VirtualPath, name: &str) -> Result<(), FsError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || name.contains('/') {
        return Err(FsError::new(
            FsErrorKind::InvalidInput,
            op,
            path.as_str(),
            format!("invalid name '{name}'"),
        ));
    }
    Ok(())
}

fn missing_id(op: FsOp, path: &VirtualPath) -> FsError {
    FsError::new(
        FsErrorKind::Api,
        op,
        path.as_str(),
        "server response carries no item id",
    )
}
