use anyhow::{bail, Result};
use clap::Args;
use navtask_kernel::{DiagnosticRequest, DiagnosticStatus};

use super::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct DiagnoseArgs {
    /// Page to load
    #[arg(long)]
    pub url: String,

    /// CSS selector to look for after load
    #[arg(long)]
    pub selector: Option<String>,

    /// Seconds to wait after load before inspecting
    #[arg(long, default_value_t = 5)]
    pub wait_time: i64,

    /// Skip the screenshot
    #[arg(long)]
    pub no_screenshot: bool,
}

pub async fn cmd_diagnose(args: DiagnoseArgs, ctx: &CliContext) -> Result<()> {
    let request = DiagnosticRequest {
        url: args.url,
        selector: args.selector,
        wait_time: args.wait_time,
        capture_screenshot: !args.no_screenshot,
    };
    let response = ctx.diagnostics().diagnose(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.status == DiagnosticStatus::Error {
        bail!(response.message);
    }
    Ok(())
}
