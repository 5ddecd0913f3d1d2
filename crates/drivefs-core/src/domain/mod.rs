//! Domain entities
//!
//! This module contains the core domain types for drivefs:
//! - Newtypes for remote item identifiers and virtual paths
//! - The `NodeStat` projection of a remote item
//! - The OAuth `Token` record
//! - Domain and filesystem error types

pub mod errors;
pub mod newtypes;
pub mod stat;
pub mod token;

// Re-export commonly used types
pub use errors::{DomainError, FsError, FsErrorKind, FsOp};
pub use newtypes::{ItemId, VirtualPath};
pub use stat::{NodeStat, DIRECTORY_MIME};
pub use token::Token;
