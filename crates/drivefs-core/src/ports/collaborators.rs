//! Collaborator ports: MIME detection and thumbnail processing
//!
//! Both are consumed by the filesystem adapter. The bundled
//! implementations are deliberately small; hosts with richer detection or
//! an image library plug in their own.

use std::path::Path;

/// MIME type used when nothing better is known
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Detects a MIME type for an item that carries none
pub trait MimeDetector: Send + Sync {
    fn detect(&self, name: &str) -> String;
}

/// Extension-based MIME detector
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeDetector;

impl MimeDetector for ExtensionMimeDetector {
    fn detect(&self, name: &str) -> String {
        let ext = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return FALLBACK_MIME.to_string(),
        };

        let mime = match ext.as_str() {
            "txt" | "log" => "text/plain",
            "md" => "text/markdown",
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "csv" => "text/csv",
            "js" => "application/javascript",
            "json" => "application/json",
            "xml" => "application/xml",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "gz" => "application/gzip",
            "tar" => "application/x-tar",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "xls" => "application/vnd.ms-excel",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "ppt" => "application/vnd.ms-powerpoint",
            "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            _ => FALLBACK_MIME,
        };
        mime.to_string()
    }
}

/// Target geometry of a generated thumbnail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailSpec {
    /// Edge length in pixels
    pub size: u32,
    /// Crop to a square instead of fitting
    pub crop: bool,
    /// Background colour for padding, e.g. `"#ffffff"`
    pub background: Option<String>,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            size: 48,
            crop: true,
            background: None,
        }
    }
}

/// Turns source image bytes into a thumbnail file
///
/// Uses `anyhow::Result` because failures are adapter-specific.
pub trait ThumbnailProcessor: Send + Sync {
    fn create(&self, source: &[u8], dest: &Path, spec: &ThumbnailSpec) -> anyhow::Result<()>;
}

/// Writes the source unchanged
///
/// Suitable when the source already is a server-side rendered thumbnail.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyThumbnailProcessor;

impl ThumbnailProcessor for CopyThumbnailProcessor {
    fn create(&self, source: &[u8], dest: &Path, _spec: &ThumbnailSpec) -> anyhow::Result<()> {
        std::fs::write(dest, source)?;
        Ok(())
    }
}
