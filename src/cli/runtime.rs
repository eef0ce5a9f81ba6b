use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use navtask_kernel::trace::DIAG_TARGET;
use navtask_kernel::Settings;
use tokio::fs;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOCAL_ENV_FILES: [&str; 2] = ["config/local.env", ".env"];

/// Apply `KEY=value` lines from local env files to variables that are not
/// already set. Returns the files that were applied.
pub fn load_local_env_overrides() -> Vec<PathBuf> {
    let mut applied = Vec::new();
    for file in LOCAL_ENV_FILES {
        let path = Path::new(file);
        if !path.exists() {
            continue;
        }
        match stdfs::read_to_string(path) {
            Ok(contents) => {
                apply_env_lines(&contents);
                applied.push(path.to_path_buf());
            }
            Err(err) => {
                eprintln!("failed to read {}: {err}", path.display());
            }
        }
    }
    applied
}

fn apply_env_lines(contents: &str) {
    for (key, value) in parse_env_lines(contents) {
        if env::var(&key).is_err() {
            env::set_var(key, value);
        }
    }
}

fn parse_env_lines(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unescape_value(value.trim())))
        })
        .collect()
}

/// Console output plus a JSON diagnostic log at `<log_dir>/task_diag.log`.
///
/// `RUST_LOG` overrides `level` for the console. The diagnostic file always
/// receives every `navtask::diag` event. The returned guard must be kept
/// alive for the file writer to flush.
pub fn init_logging(level: &str, debug: bool, log_dir: &Path) -> Result<Option<WorkerGuard>> {
    let level = if debug {
        Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let console = tracing_subscriber::fmt::layer().with_filter(console_filter);

    let (diag_layer, guard) = match stdfs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(log_dir, "task_diag.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(Targets::new().with_target(DIAG_TARGET, Level::DEBUG));
            (Some(layer), Some(guard))
        }
        Err(err) => {
            eprintln!(
                "diagnostic log disabled; cannot create {}: {err}",
                log_dir.display()
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(console)
        .with(diag_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

pub struct LoadedConfig {
    pub settings: Settings,
    /// `None` when no file was found and defaults are in use.
    pub path: Option<PathBuf>,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let (path, explicit) = match config_path {
        Some(path) => (Some(path.clone()), true),
        None => (default_config_path(), false),
    };

    let mut loaded = match path {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let settings: Settings = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            LoadedConfig {
                settings,
                path: Some(path),
            }
        }
        Some(path) if explicit => {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        _ => LoadedConfig {
            settings: Settings::default(),
            path: None,
        },
    };

    loaded.settings.apply_env_overrides();
    loaded
        .settings
        .validate()
        .context("Configuration rejected")?;
    Ok(loaded)
}

/// `./config/config.yaml`, then `<config dir>/navtask/config.yaml`.
fn default_config_path() -> Option<PathBuf> {
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return Some(local_config);
    }
    dirs::config_dir().map(|mut path| {
        path.push("navtask");
        path.push("config.yaml");
        path
    })
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
