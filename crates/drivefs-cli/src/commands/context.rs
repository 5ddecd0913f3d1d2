//! Shared state of a CLI invocation
//!
//! Resolves the configuration file, opens the keyring session and mounts
//! the configured volume for the commands that need one.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use drivefs_core::config::Config;
use drivefs_core::ports::SessionStore;
use drivefs_graph::auth::{OAuthSettings, TokenRefresher, TokenStore};
use drivefs_graph::client::ApiClient;
use drivefs_graph::session::KeyringSessionStore;
use drivefs_volume::{Collaborators, Volume};
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global flags every command receives
#[derive(Debug)]
pub struct CliContext {
    pub format: OutputFormat,
    pub quiet: bool,
    config_path: Option<PathBuf>,
}

impl CliContext {
    pub fn new(format: OutputFormat, config_path: Option<&str>, quiet: bool) -> Self {
        Self {
            format,
            quiet,
            config_path: config_path.map(PathBuf::from),
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format == OutputFormat::Json)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Loads and validates the configuration
    ///
    /// An explicit `--config` file must exist; the default location falls
    /// back to built-in defaults when absent.
    pub fn load_config(&self) -> Result<Config> {
        let config = match &self.config_path {
            Some(path) => Config::load(path)?,
            None => {
                let path = Config::default_path();
                debug!(path = %path.display(), "Loading configuration");
                Config::load_or_default(&path)
            }
        };

        let errors = config.validate();
        if !errors.is_empty() {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("Invalid configuration:\n  {}", details.join("\n  "));
        }
        Ok(config)
    }

    pub fn session(&self) -> Arc<dyn SessionStore> {
        Arc::new(KeyringSessionStore::new())
    }

    /// Mounts the configured volume with the token stored in the keyring
    pub async fn mount(&self) -> Result<Volume> {
        let config = self.load_config()?;
        let refresher = TokenRefresher::new(OAuthSettings::from_config(&config));
        let tokens = TokenStore::from_session(refresher, self.session())
            .context("Not authorized. Run 'drivefs auth url' to start the authorization")?;

        let client = ApiClient::new(&config.api.base_url, Arc::new(tokens))
            .context("Invalid api.base_url")?
            .with_max_retries(config.api.max_retries);

        let volume = Volume::mount(Arc::new(client), &config, Collaborators::default())
            .await
            .context("Failed to mount volume")?;
        Ok(volume)
    }
}
