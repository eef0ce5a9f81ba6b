use anyhow::{Context, Result};
use clap::Args;
use navtask_kernel::{TaskRequest, TaskResponse, TaskStatus};
use serde_json::json;

use super::context::CliContext;
use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Page the agent starts from
    #[arg(long)]
    pub url: String,

    /// What to do on the page, in natural language
    #[arg(long)]
    pub task: String,

    /// Model name (defaults to the configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Deadline in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Seconds the agent should wait for late content after load
    #[arg(long)]
    pub load_wait: Option<f64>,

    /// Attach the diagnostic trail to the response
    #[arg(long)]
    pub debug_mode: bool,

    #[arg(short, long, value_enum, default_value = "human")]
    pub output: OutputFormat,
}

impl RunArgs {
    fn to_request(&self) -> TaskRequest {
        TaskRequest {
            url: self.url.clone(),
            task: self.task.clone(),
            model: self.model.clone(),
            timeout: self.timeout.map(|secs| json!(secs)),
            additional_load_wait_time: self.load_wait,
            debug_mode: Some(self.debug_mode),
            additional_params: None,
        }
    }
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let orchestrator = ctx.orchestrator();
    let response = orchestrator
        .run(args.to_request(), Some("cli"))
        .await
        .context("task could not be started")?;
    print_response(&response, args.output)
}

fn print_response(response: &TaskResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(response)?),
        OutputFormat::Human => {
            let marker = match response.status {
                TaskStatus::Completed => "✓",
                TaskStatus::CompletedWithParsingError => "~",
                TaskStatus::Error => "✗",
            };
            println!("{marker} {} [{}]", response.task_id, response.status.as_str());
            if let Some(error) = &response.error {
                println!("  error: {error}");
            }
            if let Some(result) = &response.result {
                println!("{}", serde_json::to_string_pretty(result)?);
            }
            if let Some(debug) = &response.debug_info {
                println!(
                    "  {} trace entries, {:.2}s",
                    debug.logs.len(),
                    debug.execution_time
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_map_onto_request() {
        let args = RunArgs {
            url: "https://example.com".into(),
            task: "read the title".into(),
            model: Some("deepseek-chat".into()),
            timeout: Some(45.0),
            load_wait: Some(0.0),
            debug_mode: true,
            output: OutputFormat::Json,
        };
        let request = args.to_request();
        assert_eq!(request.timeout, Some(json!(45.0)));
        assert_eq!(request.additional_load_wait_time, Some(0.0));
        assert_eq!(request.model.as_deref(), Some("deepseek-chat"));
        assert_eq!(request.debug_mode, Some(true));
    }
}
