use anyhow::Result;

use super::commands::Commands;
use super::context::CliContext;
use super::diagnose::cmd_diagnose;
use super::env::CliArgs;
use super::info::cmd_info;
use super::run::cmd_run;
use super::serve::cmd_serve;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Serve(args) => cmd_serve(args, ctx).await,
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Diagnose(args) => cmd_diagnose(args, ctx).await,
        Commands::Info => cmd_info(ctx).await,
    }
}
