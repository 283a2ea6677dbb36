//! arbx order routing bot - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Multi-exchange order routing with broker stability gating
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ARBX_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    arbx_telemetry::init_logging()?;

    info!("Starting arbx-bot v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > ARBX_CONFIG env var > config/default.toml > built-in defaults
    let config = match args.config {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            arbx_bot::AppConfig::from_file(&path)?
        }
        None => arbx_bot::AppConfig::load()?,
    };
    info!(brokers = ?config.broker_names(), "Configuration loaded");

    let app = arbx_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
