//! Domain error types
//!
//! [`DomainError`] covers validation failures of domain values.
//! [`FsError`] is the structured error every public filesystem operation
//! returns: a machine-readable [`FsErrorKind`], the [`FsOp`] that failed,
//! the virtual path involved and a human-readable message, optionally
//! carrying the underlying cause.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid item identifier
    #[error("Invalid item ID: {0}")]
    InvalidItemId(String),

    /// Invalid virtual path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid file or folder name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Classification of a filesystem operation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FsErrorKind {
    /// The item does not exist
    NotFound,
    /// The item is locked and the operation was not forced
    Locked,
    /// An item with the same name already exists
    AlreadyExists,
    /// The driver does not support the operation
    Unsupported,
    /// No usable token could be obtained
    Auth,
    /// Transport-level failure
    Network,
    /// The remote API returned an error payload
    Api,
    /// An asynchronous remote operation failed or timed out
    AsyncOpFailed,
    /// The caller supplied an invalid argument
    InvalidInput,
}

impl Display for FsErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            FsErrorKind::NotFound => "not found",
            FsErrorKind::Locked => "locked",
            FsErrorKind::AlreadyExists => "already exists",
            FsErrorKind::Unsupported => "unsupported",
            FsErrorKind::Auth => "authentication error",
            FsErrorKind::Network => "network error",
            FsErrorKind::Api => "remote API error",
            FsErrorKind::AsyncOpFailed => "asynchronous operation failed",
            FsErrorKind::InvalidInput => "invalid input",
        };
        f.write_str(s)
    }
}

/// The filesystem operation an [`FsError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FsOp {
    Mount,
    Stat,
    List,
    Read,
    Write,
    Mkdir,
    Move,
    Copy,
    Remove,
    ContentUrl,
    Thumbnail,
    Archive,
    Extract,
    Symlink,
    Chmod,
}

impl Display for FsOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            FsOp::Mount => "mount",
            FsOp::Stat => "stat",
            FsOp::List => "list",
            FsOp::Read => "read",
            FsOp::Write => "write",
            FsOp::Mkdir => "mkdir",
            FsOp::Move => "move",
            FsOp::Copy => "copy",
            FsOp::Remove => "remove",
            FsOp::ContentUrl => "content-url",
            FsOp::Thumbnail => "thumbnail",
            FsOp::Archive => "archive",
            FsOp::Extract => "extract",
            FsOp::Symlink => "symlink",
            FsOp::Chmod => "chmod",
        };
        f.write_str(s)
    }
}

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured failure of a public filesystem operation
#[derive(Debug, Error)]
#[error("{op} {path}: {kind}: {message}")]
pub struct FsError {
    /// What went wrong
    pub kind: FsErrorKind,
    /// Which operation failed
    pub op: FsOp,
    /// Virtual path the operation was applied to
    pub path: String,
    /// Human-readable explanation
    pub message: String,
    /// Underlying cause, if any
    #[source]
    pub source: Option<BoxedCause>,
}

impl FsError {
    /// Creates an error without an underlying cause
    pub fn new(
        kind: FsErrorKind,
        op: FsOp,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            op,
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn not_found(op: FsOp, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::NotFound, op, path, "file not found")
    }

    pub fn locked(op: FsOp, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::Locked, op, path, "item is locked")
    }

    pub fn unsupported(op: FsOp, path: impl Into<String>) -> Self {
        Self::new(
            FsErrorKind::Unsupported,
            op,
            path,
            format!("{op} is not supported by this volume"),
        )
    }

    pub fn already_exists(op: FsOp, path: impl Into<String>, name: &str) -> Self {
        Self::new(
            FsErrorKind::AlreadyExists,
            op,
            path,
            format!("an item named '{name}' already exists"),
        )
    }

    /// Returns the error classification
    pub fn kind(&self) -> FsErrorKind {
        self.kind
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FsErrorKind::NotFound
    }
}
