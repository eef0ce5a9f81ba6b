use clap::Subcommand;

use super::diagnose::DiagnoseArgs;
use super::run::RunArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Serve the task API over HTTP
    Serve(ServeArgs),

    /// Run a single task locally and print the response
    Run(RunArgs),

    /// Check that a sandboxed browser can reach a URL
    Diagnose(DiagnoseArgs),

    /// Show version, configuration and environment checks
    Info,
}
