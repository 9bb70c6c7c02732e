use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod config;
mod error;

use crate::cli::Cli;
use crate::core::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose picks debug over info
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting codelens v{}", env!("CARGO_PKG_VERSION"));

    let engine = Engine::new(cli.config.as_deref()).await?;

    cli.execute(engine).await
}
