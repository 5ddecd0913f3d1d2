//! Configuration module for drivefs.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivefs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub volume: VolumeConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID. `None` until the user configures one.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// Redirect URI registered for the client.
    pub redirect_uri: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
}

/// Remote API endpoints and request behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL item IDs are appended to.
    pub base_url: String,
    /// OAuth authorization endpoint.
    pub auth_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// Retries after an HTTP 429 before giving up.
    pub max_retries: u32,
}

/// Mounted volume settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Virtual path of the volume root (`/` or `root` for the drive root).
    pub path: String,
    /// Display name when the drive root is mounted.
    pub root_name: String,
    /// Explicit display name, overriding the derived alias.
    pub alias: Option<String>,
    /// Request server-side thumbnail URLs with listings.
    pub use_api_thumbnail: bool,
    /// Replace an existing same-named destination when copying.
    pub copy_join: bool,
    /// Refuse mkdir when a sibling with the same name exists.
    pub check_name_collision: bool,
    /// Glob patterns of item names that cannot be removed without force.
    pub locked: Vec<String>,
    /// Directory generated thumbnails are written to.
    pub tmb_dir: Option<PathBuf>,
    /// Thumbnail edge length in pixels.
    pub tmb_size: u32,
    /// Crop thumbnails to a square.
    pub tmb_crop: bool,
    /// Padding colour for thumbnails.
    pub tmb_bg_color: Option<String>,
}

/// Asynchronous operation polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between two polls of a monitor URL (milliseconds).
    pub interval_ms: u64,
    /// Maximum number of polls per operation.
    pub max_attempts: u32,
    /// Total time budget per operation (seconds).
    pub timeout_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivefs/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivefs")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "https://login.live.com/oauth20_desktop.srf".to_string(),
            scopes: vec![
                "wl.signin".to_string(),
                "wl.offline_access".to_string(),
                "wl.skydrive_update".to_string(),
            ],
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.onedrive.com/v1.0/drive/items".to_string(),
            auth_url: "https://login.live.com/oauth20_authorize.srf".to_string(),
            token_url: "https://login.live.com/oauth20_token.srf".to_string(),
            max_retries: 3,
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            root_name: "OneDrive.com".to_string(),
            alias: None,
            use_api_thumbnail: true,
            copy_join: true,
            check_name_collision: true,
            locked: Vec::new(),
            tmb_dir: None,
            tmb_size: 48,
            tmb_crop: true,
            tmb_bg_color: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            max_attempts: 300,
            timeout_secs: 120,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl VolumeConfig {
    /// Compiles the locked name patterns, skipping invalid ones.
    ///
    /// [`Config::validate`] reports invalid patterns.
    pub fn locked_patterns(&self) -> Vec<glob::Pattern> {
        self.locked
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"polling.interval_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- auth ---
        if self.auth.client_secret.is_some() && self.auth.client_id.is_none() {
            push(
                "auth.client_id",
                "must be set when auth.client_secret is set".into(),
            );
        }
        if self.auth.scopes.is_empty() {
            push("auth.scopes", "must contain at least one scope".into());
        }

        // --- api ---
        for (field, value) in [
            ("api.base_url", &self.api.base_url),
            ("api.auth_url", &self.api.auth_url),
            ("api.token_url", &self.api.token_url),
        ] {
            if !is_http_url(value) {
                push(field, format!("not an http(s) URL: {value}"));
            }
        }

        // --- volume ---
        if self.volume.root_name.trim().is_empty() {
            push("volume.root_name", "must not be empty".into());
        }
        if self.volume.tmb_size == 0 {
            push("volume.tmb_size", "must be greater than 0".into());
        }
        for pattern in &self.volume.locked {
            if let Err(e) = glob::Pattern::new(pattern) {
                push("volume.locked", format!("invalid pattern '{pattern}': {e}"));
            }
        }

        // --- polling ---
        if self.polling.interval_ms == 0 {
            push("polling.interval_ms", "must be greater than 0".into());
        }
        if self.polling.max_attempts == 0 {
            push("polling.max_attempts", "must be greater than 0".into());
        }
        if self.polling.timeout_secs == 0 {
            push("polling.timeout_secs", "must be greater than 0".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivefs_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .client_id("my-client")
///     .volume_path("/")
///     .polling_interval_ms(500)
///     .build();
/// ```
#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- auth ---

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.client_secret = Some(secret.into());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.auth.redirect_uri = uri.into();
        self
    }

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.token_url = url.into();
        self
    }

    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.auth_url = url.into();
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.api.max_retries = n;
        self
    }

    // --- volume ---

    pub fn volume_path(mut self, path: impl Into<String>) -> Self {
        self.config.volume.path = path.into();
        self
    }

    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.config.volume.root_name = name.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.config.volume.alias = Some(alias.into());
        self
    }

    pub fn use_api_thumbnail(mut self, enabled: bool) -> Self {
        self.config.volume.use_api_thumbnail = enabled;
        self
    }

    pub fn copy_join(mut self, enabled: bool) -> Self {
        self.config.volume.copy_join = enabled;
        self
    }

    pub fn check_name_collision(mut self, enabled: bool) -> Self {
        self.config.volume.check_name_collision = enabled;
        self
    }

    pub fn locked(mut self, pattern: impl Into<String>) -> Self {
        self.config.volume.locked.push(pattern.into());
        self
    }

    pub fn tmb_dir(mut self, dir: PathBuf) -> Self {
        self.config.volume.tmb_dir = Some(dir);
        self
    }

    pub fn tmb_size(mut self, size: u32) -> Self {
        self.config.volume.tmb_size = size;
        self
    }

    // --- polling ---

    pub fn polling_interval_ms(mut self, ms: u64) -> Self {
        self.config.polling.interval_ms = ms;
        self
    }

    pub fn polling_max_attempts(mut self, n: u32) -> Self {
        self.config.polling.max_attempts = n;
        self
    }

    pub fn polling_timeout_secs(mut self, secs: u64) -> Self {
        self.config.polling.timeout_secs = secs;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
