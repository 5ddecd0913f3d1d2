//! drivefs CLI - Command-line host for a OneDrive volume
//!
//! Provides commands for:
//! - Authorizing the OneDrive client
//! - Browsing the mounted volume
//! - Creating, moving, copying and removing items
//! - Fetching content and direct download URLs

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::AuthCommand,
    browse::{CatCommand, LsCommand, RootsCommand, StatCommand, UrlCommand},
    completions::CompletionsCommand,
    context::CliContext,
    modify::{CpCommand, MkdirCommand, MvCommand, PutCommand, RmCommand},
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "drivefs", version, about = "OneDrive as a file-manager volume")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authorization commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// List a directory
    Ls(LsCommand),
    /// Show details of an item
    Stat(StatCommand),
    /// Print the content of a file
    Cat(CatCommand),
    /// Upload a local file
    Put(PutCommand),
    /// Create a directory
    Mkdir(MkdirCommand),
    /// Move or rename an item
    Mv(MvCommand),
    /// Copy an item on the server
    Cp(CpCommand),
    /// Remove an item
    Rm(RmCommand),
    /// Print a direct download URL
    Url(UrlCommand),
    /// List the folders that can be mounted
    Roots(RootsCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext::new(format, cli.config.as_deref(), cli.quiet);

    let result = match cli.command {
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
        Commands::Ls(cmd) => cmd.execute(&ctx).await,
        Commands::Stat(cmd) => cmd.execute(&ctx).await,
        Commands::Cat(cmd) => cmd.execute(&ctx).await,
        Commands::Put(cmd) => cmd.execute(&ctx).await,
        Commands::Mkdir(cmd) => cmd.execute(&ctx).await,
        Commands::Mv(cmd) => cmd.execute(&ctx).await,
        Commands::Cp(cmd) => cmd.execute(&ctx).await,
        Commands::Rm(cmd) => cmd.execute(&ctx).await,
        Commands::Url(cmd) => cmd.execute(&ctx).await,
        Commands::Roots(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            get_formatter(cli.json).error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
