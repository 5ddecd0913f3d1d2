//! Per-directory listing cache.
//!
//! Each cached directory maps its virtual path to the ordered child paths
//! plus a stat map of those children. Entries are replaced atomically and
//! are either wholly present or absent: a failed fetch installs nothing.
//!
//! Invalidation bumps a generation counter. A population that started
//! before an invalidation is returned to its caller but not installed, so
//! a stale listing can never outlive the mutation that invalidated it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use drivefs_core::domain::{ItemId, NodeStat, VirtualPath};
use drivefs_core::ports::MimeDetector;
use drivefs_graph::client::ApiClient;
use drivefs_graph::models::{DriveItem, QueryOptions};
use drivefs_graph::GraphError;
use tracing::{debug, trace, warn};

/// Children of one directory
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    /// Child paths in the order the server returned them
    pub children: Vec<VirtualPath>,
    /// Stat of every child, keyed by child path
    pub stats: HashMap<VirtualPath, NodeStat>,
}

impl DirectoryListing {
    /// Stats in listing order
    pub fn ordered_stats(&self) -> Vec<NodeStat> {
        self.children
            .iter()
            .filter_map(|p| self.stats.get(p).cloned())
            .collect()
    }

    /// True if any child is a directory
    pub fn has_subdirs(&self) -> bool {
        self.stats.values().any(NodeStat::is_dir)
    }

    /// Path of the child called `name`, compared case-insensitively
    pub fn find_by_name(&self, name: &str) -> Option<&VirtualPath> {
        let wanted = name.to_lowercase();
        self.children.iter().find(|p| {
            self.stats
                .get(*p)
                .is_some_and(|s| s.name.to_lowercase() == wanted)
        })
    }
}

// ============================================================================
// StatMapper
// ============================================================================

/// Converts remote items into [`NodeStat`]s
pub struct StatMapper {
    mime: Arc<dyn MimeDetector>,
    locked: Vec<glob::Pattern>,
    api_thumbnails: bool,
}

impl StatMapper {
    pub fn new(mime: Arc<dyn MimeDetector>, locked: Vec<glob::Pattern>, api_thumbnails: bool) -> Self {
        Self {
            mime,
            locked,
            api_thumbnails,
        }
    }

    /// Query options matching what [`StatMapper::to_stat`] consumes
    pub fn query(&self) -> QueryOptions {
        QueryOptions::stat_fields(self.api_thumbnails)
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.iter().any(|p| p.matches(name))
    }

    /// Builds the stat of `item`; `None` if the item carries no usable ID
    pub fn to_stat(&self, item: &DriveItem) -> Option<NodeStat> {
        let id = match ItemId::new(item.id.as_str()) {
            Ok(id) => id,
            Err(e) => {
                warn!(name = %item.name, error = %e, "Skipping item without usable id");
                return None;
            }
        };

        let mut stat = if item.is_folder() {
            let mut dir = NodeStat::directory(id, item.name.as_str());
            // An empty folder certainly has no subfolders; otherwise unknown
            if item.child_count() == Some(0) {
                dir.has_subdirs = Some(false);
            }
            dir
        } else {
            let mime = match item.mime_type() {
                Some(m) if !m.is_empty() => m.to_string(),
                _ => self.mime.detect(&item.name),
            };
            let mut file = NodeStat::file(id, item.name.as_str(), mime, item.size.unwrap_or(0));
            if let Some(image) = &item.image {
                file.width = image.width;
                file.height = image.height;
            }
            if self.api_thumbnails {
                file.thumbnail = item.small_thumbnail_url().map(str::to_string);
            }
            file
        };

        stat.modified = item.last_modified_date_time;
        stat.locked = self.is_locked(&item.name);
        Some(stat)
    }
}

// ============================================================================
// DirectoryCache
// ============================================================================

/// Cache of directory listings, scoped to one mounted volume
pub struct DirectoryCache {
    client: Arc<ApiClient>,
    mapper: StatMapper,
    entries: DashMap<VirtualPath, Arc<DirectoryListing>>,
    subdirs: DashMap<VirtualPath, bool>,
    generation: AtomicU64,
}

impl DirectoryCache {
    pub fn new(client: Arc<ApiClient>, mapper: StatMapper) -> Self {
        Self {
            client,
            mapper,
            entries: DashMap::new(),
            subdirs: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn mapper(&self) -> &StatMapper {
        &self.mapper
    }

    /// Cached listing of `dir`, without fetching
    pub fn cached(&self, dir: &VirtualPath) -> Option<Arc<DirectoryListing>> {
        self.entries.get(dir).map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Children of `dir`, fetched and installed on a miss
    pub async fn list_children(&self, dir: &VirtualPath) -> Result<Arc<DirectoryListing>, GraphError> {
        if let Some(listing) = self.cached(dir) {
            trace!(dir = %dir, "Directory cache hit");
            return Ok(listing);
        }

        let started = self.generation.load(Ordering::Acquire);
        debug!(dir = %dir, "Directory cache miss, fetching children");

        let items = self
            .client
            .list_children(&dir.item_id(), &self.mapper.query())
            .await?;

        let mut listing = DirectoryListing {
            children: Vec::with_capacity(items.len()),
            stats: HashMap::with_capacity(items.len()),
        };
        for stat in items.iter().filter_map(|i| self.mapper.to_stat(i)) {
            let path = dir.join(&stat.id);
            listing.children.push(path.clone());
            listing.stats.insert(path, stat);
        }
        let listing = Arc::new(listing);

        // The shard lock is held across the generation check so a concurrent
        // invalidation either happens first (and we skip) or removes our entry
        match self.entries.entry(dir.clone()) {
            Entry::Occupied(existing) => return Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                if self.generation.load(Ordering::Acquire) == started {
                    slot.insert(Arc::clone(&listing));
                    self.subdirs.insert(dir.clone(), listing.has_subdirs());
                } else {
                    debug!(dir = %dir, "Invalidated while fetching, not caching listing");
                }
            }
        }

        Ok(listing)
    }

    /// Drops the listing and subfolder flag of `dir`
    pub fn invalidate(&self, dir: &VirtualPath) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.remove(dir);
        self.subdirs.remove(dir);
        trace!(dir = %dir, "Invalidated directory");
    }

    /// Drops `dir` and every cached directory beneath it
    pub fn invalidate_tree(&self, dir: &VirtualPath) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.retain(|path, _| !path.is_within(dir));
        self.subdirs.retain(|path, _| !path.is_within(dir));
        trace!(dir = %dir, "Invalidated directory tree");
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        self.subdirs.clear();
    }

    /// Stat of the item at `path`
    ///
    /// Served from the parent's cached listing when present, otherwise
    /// fetched individually. Individually fetched stats are not cached.
    pub async fn get_stat(&self, path: &VirtualPath) -> Result<NodeStat, GraphError> {
        if let Some(parent) = path.parent() {
            if let Some(stat) = self.cached(&parent).and_then(|l| l.stats.get(path).cloned()) {
                return Ok(stat);
            }
        }

        let item = self
            .client
            .get_item(&path.item_id(), &self.mapper.query())
            .await?;
        self.mapper
            .to_stat(&item)
            .ok_or_else(|| GraphError::InvalidResponse(format!("item {path} has no id")))
    }

    /// Whether `dir` has child directories
    ///
    /// Uses the cached flag, then a cached listing, then a single
    /// `top=1` probe.
    pub async fn has_subdirs(&self, dir: &VirtualPath) -> Result<bool, GraphError> {
        if let Some(flag) = self.subdirs.get(dir) {
            return Ok(*flag);
        }

        let started = self.generation.load(Ordering::Acquire);
        let flag = match self.cached(dir) {
            Some(listing) => listing.has_subdirs(),
            None => self.client.has_child_folders(&dir.item_id()).await?,
        };

        // Same discipline as list_children: check the generation under the entry lock
        match self.subdirs.entry(dir.clone()) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                if self.generation.load(Ordering::Acquire) == started {
                    slot.insert(flag);
                } else {
                    debug!(dir = %dir, "Invalidated while probing, not caching subfolder flag");
                }
                Ok(flag)
            }
        }
    }
}
