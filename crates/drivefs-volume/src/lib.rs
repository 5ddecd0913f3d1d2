//! drivefs Volume - OneDrive as a file-manager volume
//!
//! Exposes a OneDrive folder through the [`VolumeDriver`] port:
//! - Item-ID virtual paths resolved without lookups
//! - Per-directory listing cache, invalidated by every mutation
//! - Server-side copies with bounded, cancellable polling
//! - Local thumbnails generated through a pluggable processor
//!
//! # Architecture
//!
//! The volume is an adapter in the hexagonal architecture:
//! - [`Volume`] implements [`VolumeDriver`]
//! - [`DirectoryCache`] caches listings and subfolder flags
//! - [`ThumbnailCache`] manages this mount's thumbnail files
//!
//! # Usage
//!
//! ```ignore
//! use drivefs_volume::{Collaborators, Volume};
//!
//! let volume = Volume::mount(client, &config, Collaborators::default()).await?;
//! let entries = volume.list(volume.root()).await?;
//! volume.unmount();
//! ```
//!
//! [`VolumeDriver`]: drivefs_core::ports::VolumeDriver

pub mod cache;
pub mod error;
pub mod thumbnails;
pub mod volume;

pub use cache::{DirectoryCache, DirectoryListing, StatMapper};
pub use thumbnails::ThumbnailCache;
pub use volume::{Collaborators, Volume, DRIVER_ID};
