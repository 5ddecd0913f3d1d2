//! drivefs Graph - OneDrive API client
//!
//! Provides async client for:
//! - OAuth2 authorization and proactive token refresh
//! - Item-ID-addressed OneDrive operations with transparent pagination
//! - Asynchronous copy operations with bounded, cancellable polling
//!
//! ## Modules
//!
//! - [`auth`] - Token refresh, token store and authorization code flow
//! - [`client`] - Authenticated HTTP client for the OneDrive items API
//! - [`models`] - Typed DTOs of the remote API
//! - [`operation`] - Asynchronous operation monitors
//! - [`retry`] - `Retry-After` handling for throttled requests
//! - [`session`] - System keyring backed session storage

pub mod auth;
pub mod client;
pub mod models;
pub mod operation;
pub mod retry;
pub mod session;

use std::time::Duration;
use thiserror::Error;

pub use auth::AuthError;

/// Errors that can occur when communicating with the OneDrive API
#[derive(Debug, Error)]
pub enum GraphError {
    /// No usable access token could be obtained
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The access token was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conflict was detected (e.g., name already in use)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded and the retry budget is exhausted
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked to wait
        retry_after: Duration,
    },

    /// The API returned an error payload
    #[error("API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A configured or returned URL cannot be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl GraphError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NotFound(_))
    }

    /// True for failures that may clear up on the next request
    ///
    /// Server errors, exhausted 429 retries, transport failures and
    /// unreadable bodies qualify; client errors and error payloads do not.
    pub fn is_transient(&self) -> bool {
        match self {
            GraphError::Network(_)
            | GraphError::InvalidResponse(_)
            | GraphError::TooManyRequests { .. } => true,
            GraphError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
