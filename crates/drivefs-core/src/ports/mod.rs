//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the adapter crates depend on or implement.
//!
//! ## Ports Overview
//!
//! - [`SessionStore`] - Persisted key/value session storage (tokens, OAuth state)
//! - [`MimeDetector`] - MIME type detection for items without a remote MIME type
//! - [`ThumbnailProcessor`] - Image resizing for generated thumbnails
//! - [`VolumeDriver`] - The filesystem capability set a file-manager host consumes

pub mod collaborators;
pub mod session;
pub mod volume_driver;

pub use collaborators::{
    CopyThumbnailProcessor, ExtensionMimeDetector, MimeDetector, ThumbnailProcessor,
    ThumbnailSpec, FALLBACK_MIME,
};
pub use session::{MemorySessionStore, SessionError, SessionStore};
pub use volume_driver::{ByteStream, VolumeDriver};
