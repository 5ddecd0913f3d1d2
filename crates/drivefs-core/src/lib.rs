//! drivefs Core - Domain types, ports and configuration
//!
//! This crate contains the provider-agnostic core of drivefs:
//! - **Domain types** - `ItemId`, `VirtualPath`, `NodeStat`, `Token`, `FsError`
//! - **Path codec** - translation between virtual paths and item ID chains
//! - **Port definitions** - Traits for collaborators: `SessionStore`,
//!   `MimeDetector`, `ThumbnailProcessor`, and the `VolumeDriver` capability set
//! - **Configuration** - YAML-backed `Config` with defaults and validation
//!
//! # Architecture
//!
//! Like the rest of the workspace this crate follows the ports & adapters
//! pattern. Nothing in here performs I/O except configuration loading;
//! the remote store adapter lives in `drivefs-graph` and the filesystem
//! adapter in `drivefs-volume`.

pub mod config;
pub mod domain;
pub mod path;
pub mod ports;
