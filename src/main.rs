use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use video_pipeline::app;
use video_pipeline::cli::{Cli, Commands};
use video_pipeline::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Exits with status 2 on a missing or unknown mode.
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::new().context("Invalid configuration")?;

    match cli.command {
        Commands::Acquire => {
            info!("Starting acquisition batch...");
            let report = app::run_acquisition(&config).await?;
            if !report.failed.is_empty() {
                warn!(failed = report.failed.len(), "Some work list items were skipped");
            }
        }
        Commands::Serve => {
            info!("Starting transcoding service...");
            app::run_service(&config).await?;
        }
    }

    Ok(())
}
