//! CLI subcommands

pub mod auth;
pub mod browse;
pub mod completions;
pub mod context;
pub mod modify;
