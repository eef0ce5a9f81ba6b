mod app;
mod commands;
mod context;
mod diagnose;
mod dispatch;
mod env;
mod info;
mod output;
mod run;
mod runtime;
mod serve;

pub use app::run;
pub use commands::Commands;
pub use context::CliContext;
pub use diagnose::{cmd_diagnose, DiagnoseArgs};
pub use env::CliArgs;
pub use info::cmd_info;
pub use output::OutputFormat;
pub use run::{cmd_run, RunArgs};
pub use runtime::{init_logging, load_config, load_local_env_overrides, LoadedConfig};
pub use serve::{cmd_serve, ServeArgs};
