//! OAuth2 authentication for the OneDrive API
//!
//! ## Components
//!
//! - [`OAuthSettings`] - Client credentials and endpoints
//! - [`TokenRefresher`] - `refresh_token` grant exchange
//! - [`TokenStore`] - Holds the current token and refreshes it on demand
//! - [`AuthorizationFlow`] - Authorization URL and `authorization_code` grant
//!
//! Tokens are persisted through the [`SessionStore`] port under
//! [`TOKEN_SESSION_KEY`]; the authorization flow keeps its CSRF state
//! under [`STATE_SESSION_KEY`] between the two halves of the handshake.

use std::sync::Arc;

use chrono::Utc;
use drivefs_core::config::Config;
use drivefs_core::domain::Token;
use drivefs_core::ports::{SessionError, SessionStore};
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Session key of the persisted token
pub const TOKEN_SESSION_KEY: &str = "onedrive.tokens";

/// Session key of the pending authorization state
pub const STATE_SESSION_KEY: &str = "onedrive.auth_state";

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Upper bound on a reported lifetime (one year)
const MAX_EXPIRES_IN: i64 = 365 * 24 * 3600;

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Errors of the authentication layer
#[derive(Debug, Error)]
pub enum AuthError {
    /// Client ID or secret is not configured
    #[error("Missing client credentials: {0}")]
    MissingCredentials(&'static str),

    /// The token cannot be refreshed because it has no refresh token
    #[error("Token expired and no refresh token is available")]
    MissingRefreshToken,

    /// No token has been obtained yet
    #[error("Not authorized; complete the authorization flow first")]
    NotAuthorized,

    /// The token endpoint rejected the exchange or could not be reached
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// The token endpoint answered with an unusable payload
    #[error("Invalid token payload: {0}")]
    InvalidPayload(String),

    /// The returned state does not match the pending authorization
    #[error("Authorization state mismatch")]
    StateMismatch,

    /// An endpoint URL is malformed
    #[error("Invalid OAuth configuration: {0}")]
    InvalidConfig(String),

    /// Session storage failed
    #[error(transparent)]
    Session(#[from] SessionError),
}

// ============================================================================
// OAuthSettings
// ============================================================================

/// Client credentials and endpoints of the authorization service
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthSettings {
    /// Extracts the OAuth settings from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.auth.client_id.clone(),
            client_secret: config.auth.client_secret.clone(),
            auth_url: config.api.auth_url.clone(),
            token_url: config.api.token_url.clone(),
            redirect_uri: config.auth.redirect_uri.clone(),
            scopes: config.auth.scopes.clone(),
        }
    }

    /// Builds the oauth2 client; the secret is optional for public clients
    fn client(&self, require_secret: bool) -> Result<OAuthClient, AuthError> {
        let client_id = self
            .client_id
            .clone()
            .ok_or(AuthError::MissingCredentials("client_id"))?;

        let mut client = BasicClient::new(ClientId::new(client_id))
            .set_auth_uri(
                AuthUrl::new(self.auth_url.clone())
                    .map_err(|e| AuthError::InvalidConfig(format!("auth_url: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(self.token_url.clone())
                    .map_err(|e| AuthError::InvalidConfig(format!("token_url: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(self.redirect_uri.clone())
                    .map_err(|e| AuthError::InvalidConfig(format!("redirect_uri: {e}")))?,
            )
            .set_auth_type(AuthType::RequestBody);

        match &self.client_secret {
            Some(secret) => client = client.set_client_secret(ClientSecret::new(secret.clone())),
            None if require_secret => {
                return Err(AuthError::MissingCredentials("client_secret"));
            }
            None => {}
        }

        Ok(client)
    }
}

/// Builds a [`Token`] from a token endpoint response
fn token_from_response<R: TokenResponse>(response: &R, previous_refresh: Option<&str>) -> Token {
    let expires_in = response
        .expires_in()
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX).min(MAX_EXPIRES_IN))
        .unwrap_or(DEFAULT_EXPIRES_IN);

    Token {
        access_token: response.access_token().secret().to_string(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .or_else(|| previous_refresh.map(str::to_string)),
        obtained_at: Utc::now(),
        expires_in,
    }
}

fn exchange_error<RE, T>(err: RequestTokenError<RE, T>) -> AuthError
where
    RE: std::error::Error + 'static,
    T: oauth2::ErrorResponse + 'static,
{
    match err {
        RequestTokenError::Parse(e, _) => AuthError::InvalidPayload(e.to_string()),
        other => AuthError::Exchange(other.to_string()),
    }
}

fn persist_token(session: &dyn SessionStore, token: &Token) -> Result<(), AuthError> {
    let json =
        serde_json::to_string(token).map_err(|e| AuthError::InvalidPayload(e.to_string()))?;
    session.set(TOKEN_SESSION_KEY, &json)?;
    Ok(())
}

/// Reads the persisted token, if any
pub fn load_token(session: &dyn SessionStore) -> Result<Option<Token>, AuthError> {
    let Some(json) = session.get(TOKEN_SESSION_KEY)? else {
        return Ok(None);
    };
    let token = serde_json::from_str(&json).map_err(|e| SessionError::Corrupt {
        key: TOKEN_SESSION_KEY.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(token))
}

// ============================================================================
// TokenRefresher
// ============================================================================

/// Performs the `refresh_token` grant
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    settings: OAuthSettings,
    http: reqwest::Client,
}

impl TokenRefresher {
    pub fn new(settings: OAuthSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    /// Returns a usable token, exchanging the refresh token if needed
    ///
    /// A still-valid token is returned unchanged without any network call.
    pub async fn refresh(&self, token: &Token) -> Result<Token, AuthError> {
        if token.is_valid() {
            return Ok(token.clone());
        }

        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(AuthError::MissingRefreshToken)?;
        let client = self.settings.client(true)?;

        info!("Refreshing access token");

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(exchange_error)?;

        let refreshed = token_from_response(&response, Some(refresh_token));
        debug!(expires_in = refreshed.expires_in, "Access token refreshed");
        Ok(refreshed)
    }
}

// ============================================================================
// TokenStore
// ============================================================================

/// Current token of a mounted volume
///
/// The mutex is held across the validity check and the refresh, so
/// concurrent callers that find the token stale trigger a single exchange.
pub struct TokenStore {
    token: Mutex<Option<Token>>,
    refresher: TokenRefresher,
    session: Arc<dyn SessionStore>,
}

impl TokenStore {
    /// Creates a store holding `token`
    pub fn new(token: Token, refresher: TokenRefresher, session: Arc<dyn SessionStore>) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            refresher,
            session,
        }
    }

    /// Creates a store from the token persisted in the session
    ///
    /// # Errors
    ///
    /// `AuthError::NotAuthorized` if the session holds no token.
    pub fn from_session(
        refresher: TokenRefresher,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, AuthError> {
        let token = load_token(session.as_ref())?.ok_or(AuthError::NotAuthorized)?;
        Ok(Self::new(token, refresher, session))
    }

    /// Returns a valid access token, refreshing and persisting it when stale
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut guard = self.token.lock().await;
        let current = guard.as_ref().ok_or(AuthError::NotAuthorized)?;

        if current.is_valid() {
            return Ok(current.access_token.clone());
        }

        let refreshed = self.refresher.refresh(current).await?;
        persist_token(self.session.as_ref(), &refreshed)?;
        let access = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(access)
    }

    /// Ensures a usable token exists, refreshing it if needed
    pub async fn ensure_valid(&self) -> Result<(), AuthError> {
        self.access_token().await.map(|_| ())
    }

    /// Snapshot of the current token
    pub async fn current(&self) -> Option<Token> {
        self.token.lock().await.clone()
    }

    /// Forgets the token in memory and in the session
    pub async fn clear(&self) -> Result<(), AuthError> {
        let mut guard = self.token.lock().await;
        *guard = None;
        self.session.remove(TOKEN_SESSION_KEY)?;
        info!("Cleared stored OAuth token");
        Ok(())
    }
}

// ============================================================================
// AuthorizationFlow
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PendingAuthorization {
    csrf: String,
}

/// Authorization code flow
///
/// The interactive part (showing the URL, receiving the redirect) belongs
/// to the host. This type builds the URL, remembers the CSRF state and
/// redeems the returned code.
pub struct AuthorizationFlow {
    settings: OAuthSettings,
    session: Arc<dyn SessionStore>,
    http: reqwest::Client,
}

impl AuthorizationFlow {
    pub fn new(settings: OAuthSettings, session: Arc<dyn SessionStore>) -> Self {
        Self {
            settings,
            session,
            http: reqwest::Client::new(),
        }
    }

    /// Returns the authorization URL and stores the pending state
    pub fn begin(&self) -> Result<String, AuthError> {
        let client = self.settings.client(false)?;

        let (url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.settings.scopes.iter().cloned().map(Scope::new))
            .url();

        let pending = PendingAuthorization {
            csrf: csrf.secret().to_string(),
        };
        let json =
            serde_json::to_string(&pending).map_err(|e| AuthError::InvalidPayload(e.to_string()))?;
        self.session.set(STATE_SESSION_KEY, &json)?;

        debug!("Generated authorization URL");
        Ok(url.to_string())
    }

    /// Redeems an authorization code and persists the resulting token
    ///
    /// When `state` is given it must match the state stored by [`begin`].
    ///
    /// [`begin`]: AuthorizationFlow::begin
    pub async fn complete(&self, code: &str, state: Option<&str>) -> Result<Token, AuthError> {
        if let Some(state) = state {
            let pending: Option<PendingAuthorization> = self
                .session
                .get(STATE_SESSION_KEY)?
                .and_then(|json| serde_json::from_str(&json).ok());
            match pending {
                Some(p) if p.csrf == state => {}
                _ => {
                    warn!("Authorization state mismatch");
                    return Err(AuthError::StateMismatch);
                }
            }
        }

        let client = self.settings.client(true)?;

        info!("Exchanging authorization code for tokens");
        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(exchange_error)?;

        let token = token_from_response(&response, None);
        persist_token(self.session.as_ref(), &token)?;
        self.session.remove(STATE_SESSION_KEY)?;

        info!("Successfully obtained OAuth tokens");
        Ok(token)
    }

    /// Token currently persisted in the session
    pub fn stored_token(&self) -> Result<Option<Token>, AuthError> {
        load_token(self.session.as_ref())
    }

    /// Drops the token and any pending state, forcing a new authorization
    pub fn reauthorize(&self) -> Result<(), AuthError> {
        self.session.remove(TOKEN_SESSION_KEY)?;
        self.session.remove(STATE_SESSION_KEY)?;
        info!("Removed stored authorization");
        Ok(())
    }
}
