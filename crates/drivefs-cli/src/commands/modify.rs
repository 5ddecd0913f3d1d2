//! Mutating commands: put, mkdir, mv, cp and rm

use std::path::PathBuf;

use anyhow::{Context, Result};
use drivefs_core::domain::VirtualPath;
use drivefs_core::ports::VolumeDriver;
use drivefs_volume::Volume;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use super::context::CliContext;
use crate::output::{entry_json, OutputFormatter};

/// Prints the item a command produced
async fn report(
    ctx: &CliContext,
    fmt: &dyn OutputFormatter,
    volume: &Volume,
    verb: &str,
    path: &VirtualPath,
) -> Result<()> {
    if ctx.is_json() {
        let stat = volume.stat(path).await?;
        fmt.print_json(&entry_json(path, &stat));
    } else if !ctx.quiet {
        fmt.success(&format!("{verb} {path}"));
    }
    Ok(())
}

/// Token cancelled when the user presses Ctrl-C
///
/// Cancelling the token releases the signal watcher.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let watcher = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = signal::ctrl_c() => {
                if result.is_ok() {
                    watcher.cancel();
                }
            }
            _ = watcher.cancelled() => {}
        }
    });
    token
}

#[derive(Debug, clap::Args)]
pub struct PutCommand {
    /// Local file to upload
    pub local: PathBuf,

    /// Destination directory, or the file to replace with --replace
    pub target: String,

    /// Remote name (defaults to the local file name)
    #[arg(long, conflicts_with = "replace")]
    pub name: Option<String>,

    /// Replace the content of the existing file TARGET
    #[arg(long)]
    pub replace: bool,
}

impl PutCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let content = tokio::fs::read(&self.local)
            .await
            .with_context(|| format!("Failed to read {}", self.local.display()))?;

        let volume = ctx.mount().await?;
        let target = volume.normalize_path(&self.target);

        let written = if self.replace {
            volume.put_contents(&target, content).await?;
            target
        } else {
            let name = match &self.name {
                Some(name) => name.clone(),
                None => self
                    .local
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .context("Local path has no usable file name; pass --name")?,
            };
            volume.write(&target, &name, content).await?
        };

        report(ctx, &*fmt, &volume, "Uploaded", &written).await?;
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct MkdirCommand {
    /// Parent directory
    pub parent: String,

    /// Name of the new directory
    pub name: String,
}

impl MkdirCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let parent = volume.normalize_path(&self.parent);

        let created = volume.mkdir(&parent, &self.name).await?;
        report(ctx, &*fmt, &volume, "Created", &created).await?;
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct MvCommand {
    /// Item to move
    pub source: String,

    /// Destination directory
    pub target_dir: String,

    /// New name (defaults to the current name)
    #[arg(long)]
    pub name: Option<String>,
}

impl MvCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let source = volume.normalize_path(&self.source);
        let target_dir = volume.normalize_path(&self.target_dir);

        let name = match &self.name {
            Some(name) => name.clone(),
            None => volume.stat(&source).await?.name,
        };
        let moved = volume.move_item(&source, &target_dir, &name).await?;
        report(ctx, &*fmt, &volume, "Moved to", &moved).await?;
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct CpCommand {
    /// Item to copy
    pub source: String,

    /// Destination directory
    pub target_dir: String,

    /// Name of the copy (defaults to the source name)
    #[arg(long)]
    pub name: Option<String>,
}

impl CpCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let source = volume.normalize_path(&self.source);
        let target_dir = volume.normalize_path(&self.target_dir);

        let name = match &self.name {
            Some(name) => name.clone(),
            None => volume.stat(&source).await?.name,
        };

        if !ctx.is_json() && !ctx.quiet {
            fmt.info("Copying on the server, press Ctrl-C to stop waiting...");
        }
        let cancel = cancel_on_ctrl_c();
        let copied = volume
            .copy_cancellable(&source, &target_dir, &name, &cancel)
            .await?;
        cancel.cancel();

        report(ctx, &*fmt, &volume, "Copied to", &copied).await?;
        volume.unmount();
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct RmCommand {
    /// Item to remove
    pub path: String,

    /// Remove even if the item is locked
    #[arg(short, long)]
    pub force: bool,
}

impl RmCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let volume = ctx.mount().await?;
        let path = volume.normalize_path(&self.path);

        let removed = volume.remove(&path, self.force).await?;
        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({ "path": path.as_str(), "removed": removed }));
        } else if removed {
            if !ctx.quiet {
                fmt.success(&format!("Removed {path}"));
            }
        } else {
            fmt.warn(&format!("{path} was already gone"));
        }
        volume.unmount();
        Ok(())
    }
}
