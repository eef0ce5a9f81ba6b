use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::context::CliContext;
use crate::server::{build_router, AuthPolicy, ServeState};

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to bind (defaults to server.host from config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (defaults to server.port from config)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let settings = ctx.settings();
    let host = args.host.unwrap_or_else(|| settings.server.host.clone());
    let port = args.port.unwrap_or(settings.server.port);

    let allow_dev_key = !settings.is_production();
    if allow_dev_key {
        warn!(
            environment = %settings.environment,
            "development key accepted outside production"
        );
    }
    let auth = Arc::new(AuthPolicy::from_credentials(ctx.credentials(), allow_dev_key));
    let state = ServeState::new(
        ctx.orchestrator(),
        ctx.diagnostics(),
        settings.environment.clone(),
        settings.diag_log_path(),
    );
    let router = build_router(state, auth);

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    let local = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!(
        addr = %local,
        model = %settings.defaults.model,
        timeout = %humantime::format_duration(settings.default_timeout()),
        "navtask API listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited unexpectedly")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
