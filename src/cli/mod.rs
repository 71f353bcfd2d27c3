//! CLI module for Motorpool
//!
//! - `serve`: Start the HTTP server (default)
//! - `config`: Print the effective configuration

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::server;

/// Motorpool car lease service
#[derive(Parser, Debug)]
#[command(name = "motorpool")]
#[command(about = "Car pool lease registry with live event feed")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Print the merged configuration as TOML
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = server::load_config()?;
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server::run(config).await,
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("{}", rendered);
            Ok(())
        }
    }
}
