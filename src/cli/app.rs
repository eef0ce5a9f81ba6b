use anyhow::Result;
use clap::Parser;
use navtask_kernel::Credentials;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, load_local_env_overrides, LoadedConfig};

pub async fn run() -> Result<()> {
    let env_files = load_local_env_overrides();
    let cli = CliArgs::parse();

    let LoadedConfig { settings, path } = load_config(cli.config.as_ref()).await?;
    let _log_guard = init_logging(&cli.log_level, cli.debug, &settings.log_dir)?;

    info!("Starting navtask v{}", env!("CARGO_PKG_VERSION"));
    for file in &env_files {
        info!(path = %file.display(), "Loaded environment overrides");
    }
    match &path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let ctx = CliContext::new(settings, Credentials::from_env(), path);

    match dispatch(&cli, &ctx).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
