//! Local thumbnail files.
//!
//! Thumbnails of one volume share a file name prefix derived from the
//! driver ID and a SHA-256 of the mount key, so several mounts can use the
//! same directory and each can purge only its own files:
//! `{tmb_dir}/{prefix}{item_id}{mtime}.png`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use drivefs_core::domain::NodeStat;
use drivefs_core::ports::{ThumbnailProcessor, ThumbnailSpec};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Length of the hash part of the prefix
const PREFIX_HASH_LEN: usize = 12;

/// Thumbnail files of one mounted volume
pub struct ThumbnailCache {
    dir: PathBuf,
    prefix: String,
    spec: ThumbnailSpec,
    processor: Arc<dyn ThumbnailProcessor>,
}

impl ThumbnailCache {
    pub fn new(
        dir: PathBuf,
        driver_id: &str,
        mount_key: &str,
        spec: ThumbnailSpec,
        processor: Arc<dyn ThumbnailProcessor>,
    ) -> Self {
        Self {
            dir,
            prefix: Self::prefix_for(driver_id, mount_key),
            spec,
            processor,
        }
    }

    /// `{driver_id}{first hex digits of sha256(mount_key)}`
    fn prefix_for(driver_id: &str, mount_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(mount_key.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        format!("{driver_id}{}", &hash[..PREFIX_HASH_LEN])
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// File name of the thumbnail of `stat`
    pub fn file_name(&self, stat: &NodeStat) -> String {
        format!("{}{}{}.png", self.prefix, stat.id, stat.timestamp())
    }

    pub fn path_for(&self, stat: &NodeStat) -> PathBuf {
        self.dir.join(self.file_name(stat))
    }

    /// Existing thumbnail of `stat`, if one was created
    pub fn existing(&self, stat: &NodeStat) -> Option<String> {
        self.path_for(stat)
            .is_file()
            .then(|| self.file_name(stat))
    }

    /// Creates the thumbnail of `stat` from `source` and returns its file name
    pub fn create(&self, stat: &NodeStat, source: &[u8]) -> anyhow::Result<String> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create thumbnail directory {}", self.dir.display()))?;

        let name = self.file_name(stat);
        let path = self.dir.join(&name);
        self.processor
            .create(source, &path, &self.spec)
            .with_context(|| format!("Failed to create thumbnail {}", path.display()))?;

        debug!(item = %stat.id, file = %name, "Created thumbnail");
        Ok(name)
    }

    /// Removes the thumbnail of `stat`; true if a file was deleted
    pub fn evict(&self, stat: &NodeStat) -> bool {
        let path = self.path_for(stat);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(item = %stat.id, "Evicted thumbnail");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove thumbnail");
                false
            }
        }
    }

    /// Removes every thumbnail of this volume and returns how many were deleted
    pub fn purge(&self) -> std::io::Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let ours = name
                .to_str()
                .is_some_and(|n| n.starts_with(&self.prefix) && n.ends_with(".png"));
            if ours && entry.path().is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        debug!(prefix = %self.prefix, removed, "Purged thumbnails");
        Ok(removed)
    }
}
