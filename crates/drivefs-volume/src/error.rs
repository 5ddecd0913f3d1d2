//! Error mapping for volume operations.
//!
//! Remote failures reach the host as [`FsError`]s that keep the
//! [`GraphError`] as their source.

use drivefs_core::domain::{FsError, FsErrorKind, FsOp, VirtualPath};
use drivefs_graph::GraphError;

/// Classifies a remote failure
pub fn kind_of(err: &GraphError) -> FsErrorKind {
    match err {
        GraphError::Auth(_) | GraphError::Unauthorized(_) => FsErrorKind::Auth,
        GraphError::Network(_) => FsErrorKind::Network,
        GraphError::NotFound(_) => FsErrorKind::NotFound,
        GraphError::Conflict(_) => FsErrorKind::AlreadyExists,
        GraphError::TooManyRequests { .. }
        | GraphError::Api { .. }
        | GraphError::InvalidResponse(_)
        | GraphError::InvalidUrl(_) => FsErrorKind::Api,
    }
}

/// Wraps a remote failure of `op` on `path`
pub fn from_graph(op: FsOp, path: &VirtualPath, err: GraphError) -> FsError {
    let kind = kind_of(&err);
    let message = match kind {
        FsErrorKind::NotFound => "file not found".to_string(),
        _ => err.to_string(),
    };
    FsError::new(kind, op, path.as_str(), message).with_source(err)
}

/// Attaches operation context to remote results
pub trait GraphResultExt<T> {
    fn for_op(self, op: FsOp, path: &VirtualPath) -> Result<T, FsError>;
}

impl<T> GraphResultExt<T> for Result<T, GraphError> {
    fn for_op(self, op: FsOp, path: &VirtualPath) -> Result<T, FsError> {
        self.map_err(|e| from_graph(op, path, e))
    }
}
