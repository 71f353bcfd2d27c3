//! Motorpool - car pool lease service
//!
//! CLI entry point for the Motorpool server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use motorpool::cli;

const DEFAULT_LOG_FILTER: &str = "motorpool=info,motorpool_core=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!("Failed to read .env: {}", e);
        }
    }

    cli::run(cli).await
}
