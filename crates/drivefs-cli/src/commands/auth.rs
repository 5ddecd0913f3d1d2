//! Auth commands - authorization code flow and token status
//!
//! The CLI has no redirect listener. `auth url` prints the authorization
//! URL; after signing in, the user passes the `code` query parameter of
//! the redirect to `auth complete`. Tokens live in the system keyring.

use anyhow::{Context, Result};
use clap::Subcommand;
use drivefs_graph::auth::{load_token, AuthorizationFlow, OAuthSettings};
use tracing::info;

use super::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Print the URL to open for signing in
    Url,
    /// Redeem the code returned to the redirect URI
    Complete {
        /// Value of the `code` query parameter
        code: String,
        /// Value of the `state` query parameter, checked when given
        #[arg(long)]
        state: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Check authorization status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AuthCommand::Url => self.execute_url(ctx),
            AuthCommand::Complete { code, state } => {
                self.execute_complete(ctx, code, state.as_deref()).await
            }
            AuthCommand::Logout => self.execute_logout(ctx),
            AuthCommand::Status => self.execute_status(ctx),
        }
    }

    fn flow(ctx: &CliContext) -> Result<AuthorizationFlow> {
        let config = ctx.load_config()?;
        if config.auth.client_id.is_none() {
            anyhow::bail!("No client ID configured. Set auth.client_id in config.yaml");
        }
        Ok(AuthorizationFlow::new(
            OAuthSettings::from_config(&config),
            ctx.session(),
        ))
    }

    fn execute_url(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let url = Self::flow(ctx)?
            .begin()
            .context("Failed to build authorization URL")?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({ "url": url }));
        } else {
            fmt.info("Open this URL in a browser and sign in:");
            println!("{url}");
            fmt.info("Then run 'drivefs auth complete <code> --state <state>'");
        }
        Ok(())
    }

    async fn execute_complete(
        &self,
        ctx: &CliContext,
        code: &str,
        state: Option<&str>,
    ) -> Result<()> {
        let fmt = ctx.formatter();
        let token = Self::flow(ctx)?
            .complete(code, state)
            .await
            .context("Authorization failed")?;

        info!(expires_at = %token.expires_at(), "Authorized");
        fmt.success("Authorized with OneDrive");
        fmt.info(&format!(
            "Access token valid until {}",
            token.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        Ok(())
    }

    fn execute_logout(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        Self::flow(ctx)?
            .reauthorize()
            .context("Failed to clear credentials from keyring")?;

        fmt.success("Logged out successfully");
        fmt.info("Credentials removed from keyring");
        Ok(())
    }

    fn execute_status(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let session = ctx.session();
        let token = load_token(session.as_ref()).context("Failed to read keyring")?;

        let (status, expires_at, refreshable) = match &token {
            Some(t) if t.is_valid() => ("Valid", Some(t.expires_at()), t.refresh_token.is_some()),
            Some(t) => ("Expired", Some(t.expires_at()), t.refresh_token.is_some()),
            None => ("Not found", None, false),
        };

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "authorized": token.is_some(),
                "token_status": status,
                "expires_at": expires_at.map(|t| t.to_rfc3339()),
                "refreshable": refreshable,
            }));
            return Ok(());
        }

        match expires_at {
            Some(expires_at) => {
                fmt.success("Authorized");
                fmt.info(&format!("Token status:  {status}"));
                fmt.info(&format!(
                    "Expires at:    {}",
                    expires_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
                fmt.info(&format!(
                    "Refreshable:   {}",
                    if refreshable { "yes" } else { "no" }
                ));
            }
            None => {
                fmt.info("Authorization status: Not configured");
                fmt.info("Run 'drivefs auth url' to authorize");
            }
        }
        Ok(())
    }
}
