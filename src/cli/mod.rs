//! CLI module for authkeep
//!
//! Maintenance subcommands run against the configured database:
//! - `migrate`: apply pending schema migrations
//! - `purge-tokens`: delete expired signup and password reset tokens

pub mod migrate;
pub mod purge_tokens;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// authkeep - credential and identity lifecycle engine
#[derive(Parser)]
#[command(name = "authkeep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Delete tokens that are past their expiry
    PurgeTokens,
}

/// Load `.env`, the layered configuration and the log subscriber
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    logging::init_logging(&config.logging)?;

    if let Err(e) = loaded {
        warn!(error = %e, "Failed to load configuration, using defaults");
    }

    Ok(config)
}
