//! System keyring session storage
//!
//! Uses the `keyring` crate to keep session values (OAuth tokens, pending
//! authorization state) in the OS credential store (GNOME Keyring, KDE
//! Wallet, macOS Keychain). Each session key becomes one keyring entry
//! under the service name of the store.

use drivefs_core::ports::{SessionError, SessionStore};
use tracing::debug;

/// Default keyring service name
pub const KEYRING_SERVICE: &str = "drivefs";

/// [`SessionStore`] backed by the system keyring
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service: String,
    /// Prefix added to every key, e.g. an account or profile name
    namespace: Option<String>,
}

impl KeyringSessionStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
            namespace: None,
        }
    }

    /// Keeps entries of several profiles apart
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn username(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{key}"),
            None => key.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, SessionError> {
        keyring::Entry::new(&self.service, &self.username(key))
            .map_err(|e| SessionError::Unavailable(format!("keyring entry for '{key}': {e}")))
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                debug!(key, "Loaded session value from keyring");
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SessionError::Unavailable(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        debug!(key, "Stored session value in keyring");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SessionError::Unavailable(e.to_string())),
        }
    }
}
