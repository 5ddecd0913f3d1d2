//! Read-only commands: ls, stat, cat, url and roots
//!
//! Paths are virtual paths of item IDs, e.g. `/` or `/A1B2/C3D4`, as
//! printed in the last column of `drivefs ls`.

use anyhow::{Context, Result};
use drivefs_core::domain::{NodeStat, VirtualPath};
use drivefs_core::ports::VolumeDriver;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use super::context::CliContext;
use crate::output::{entry_json, format_size};

#[derive(Debug, clap::Args)]
pub struct LsCommand {
    /// Directory to list (defaults to the volume root)
    pub path: Option<String>,

    /// Show only directories
    #[arg(long)]
    pub dirs: bool,
}

impl LsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let dir = match &self.path {
            Some(raw) => volume.normalize_path(raw),
            None => volume.root().clone(),
        };

        let entries = volume.list(&dir).await?;
        let entries: Vec<_> = entries
            .into_iter()
            .filter(|s| !self.dirs || s.is_dir())
            .collect();

        if ctx.is_json() {
            let items: Vec<_> = entries
                .iter()
                .map(|s| entry_json(&dir.join(&s.id), s))
                .collect();
            fmt.print_json(&serde_json::json!({ "path": dir.as_str(), "items": items }));
        } else {
            for stat in &entries {
                fmt.entry(&dir.join(&stat.id), stat);
            }
            if !ctx.quiet {
                fmt.info(&format!("{} item(s)", entries.len()));
            }
        }
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct StatCommand {
    /// Item to describe
    pub path: String,
}

impl StatCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let path = volume.normalize_path(&self.path);
        let stat = volume.stat(&path).await?;

        if ctx.is_json() {
            fmt.print_json(&entry_json(&path, &stat));
        } else {
            fmt.success(&stat.name);
            fmt.info(&format!("Path:      {path}"));
            fmt.info(&format!("ID:        {}", stat.id));
            fmt.info(&format!("Type:      {}", stat.mime));
            if let Some(size) = stat.size {
                fmt.info(&format!("Size:      {}", format_size(size)));
            }
            if let Some(modified) = stat.modified {
                fmt.info(&format!(
                    "Modified:  {}",
                    modified.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            if let Some(dimensions) = stat.dimensions() {
                fmt.info(&format!("Size (px): {dimensions}"));
            }
            if let Some(subdirs) = stat.has_subdirs {
                fmt.info(&format!("Subdirs:   {}", if subdirs { "yes" } else { "no" }));
            }
            if stat.locked {
                fmt.warn("Item is locked");
            }
        }
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct CatCommand {
    /// File to print
    pub path: String,
}

impl CatCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let volume = ctx.mount().await?;
        let path = volume.normalize_path(&self.path);

        let mut stream = volume.read(&path).await?;
        let mut stdout = tokio::io::stdout();
        while let Some(chunk) = stream.next().await {
            stdout
                .write_all(&chunk?)
                .await
                .context("Failed to write to stdout")?;
        }
        stdout.flush().await?;
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct UrlCommand {
    /// File to link
    pub path: String,
}

impl UrlCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let path = volume.normalize_path(&self.path);
        let url = volume.content_url(&path).await?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({ "path": path.as_str(), "url": url }));
        } else {
            match url {
                Some(url) => println!("{url}"),
                None => fmt.warn(&format!("No direct URL available for {path}")),
            }
        }
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct RootsCommand {}

impl RootsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let folders = volume.root_folders().await?;

        if ctx.is_json() {
            let items: Vec<_> = folders
                .iter()
                .map(|s| entry_json(&mount_path(s), s))
                .collect();
            fmt.print_json(&serde_json::json!({ "roots": items }));
        } else {
            for stat in &folders {
                fmt.entry(&mount_path(stat), stat);
            }
        }
        volume.unmount();
        Ok(())
    }
}

/// Value of `volume.path` that mounts `stat`
fn mount_path(stat: &NodeStat) -> VirtualPath {
    let root = VirtualPath::root();
    if stat.id.is_root() {
        root
    } else {
        root.join(&stat.id)
    }
}
