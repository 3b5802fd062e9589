use anyhow::{Context, Result};
use clap::Parser;
use healwright::{load_config, logging::init_logging};
use tracing::{debug, error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let loaded = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| loaded.config.logging.level.clone());
    init_logging(&level, cli.debug, cli.json_logs || loaded.config.logging.json)?;

    info!("Starting healwright v{}", env!("CARGO_PKG_VERSION"));
    if loaded.from_file {
        info!("Loaded configuration from: {}", loaded.path.display());
    } else {
        debug!("No config file at {}, using defaults", loaded.path.display());
    }

    let ctx = CliContext::new(loaded);
    match dispatch(&cli, &ctx).await {
        Ok(()) => {
            debug!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
