//! Vigil - policy-validated task orchestration
//!
//! CLI entry point for the Vigil server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vigil::cli;

const DEFAULT_LOG_FILTER: &str = "vigil=info,vigil_core=info,vigil_llm=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_logs = std::env::var("VIGIL_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cli = cli::Cli::parse();
    if matches!(cli.command, Some(cli::Commands::Serve)) {
        info!("Starting Vigil v{}", env!("CARGO_PKG_VERSION"));
    }

    cli::run(cli).await
}
