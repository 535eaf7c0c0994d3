//! CLI module for unified-llm
//!
//! Subcommands:
//! - `call`: send a one-shot system + user conversation to a provider
//! - `providers`: list the available providers and their credential status

pub mod call;
pub mod providers;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Unified call interface over several LLM vendors
#[derive(Parser)]
#[command(name = "unified-llm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send a prompt to one provider and print the answer
    Call(call::CallArgs),

    /// List providers, configured models and credential availability
    Providers,
}

/// Load `.env`, the layered configuration and the global subscriber
pub fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}
