//! Session storage port
//!
//! The token store and the authorization flow persist their state through
//! this port. Values are opaque strings (JSON in practice); the storage
//! mechanism is an adapter concern.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

/// Errors raised by a session storage backend
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend could not be reached or refused the operation
    #[error("Session storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded
    #[error("Corrupt session value for '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

/// Key/value storage that outlives a single volume instance
pub trait SessionStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// In-process session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self
            .values
            .read()
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        values.remove(key);
        Ok(())
    }
}
