use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::{BrowserConfig, HeadlessMode};

use crate::config::SandboxConfig;
use crate::error::SandboxError;

const BROWSER_BINARIES: [&str; 6] = [
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: [&str; 2] = [
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(not(target_os = "macos"))]
const INSTALL_LOCATIONS: [&str; 3] = [
    "/usr/bin/chromium",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
];

/// Browser binary for `cfg`.
///
/// A configured executable must exist. Without one, the first known binary
/// on `PATH` wins, then a fixed install location. `Ok(None)` leaves the
/// choice to chromiumoxide.
pub fn resolve_executable(cfg: &SandboxConfig) -> Result<Option<PathBuf>, SandboxError> {
    if let Some(path) = &cfg.executable {
        if !path.exists() {
            return Err(SandboxError::ExecutableMissing(path.display().to_string()));
        }
        return Ok(Some(path.clone()));
    }
    let on_path = BROWSER_BINARIES
        .iter()
        .find_map(|name| which::which(name).ok());
    Ok(on_path.or_else(|| {
        INSTALL_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }))
}

/// Flags that keep a sandboxed browser from sharing or persisting anything.
///
/// The profile directory itself is passed separately through
/// [`BrowserConfig`] so it always points at the per-task storage.
pub fn isolation_args(cfg: &SandboxConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "--incognito",
        "--disk-cache-size=1",
        "--media-cache-size=1",
        "--disable-application-cache",
        "--disable-background-networking",
        "--disable-background-timer-throttling",
        "--disable-breakpad",
        "--disable-client-side-phishing-detection",
        "--disable-component-update",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-sync",
        "--metrics-recording-only",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--use-mock-keychain",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    if cfg.headless {
        args.push("--hide-scrollbars".to_string());
        args.push("--mute-audio".to_string());
    }
    args
}

/// Build the Chromium launch configuration for one sandbox.
pub fn browser_config(cfg: &SandboxConfig, storage: &Path) -> Result<BrowserConfig, SandboxError> {
    let executable = resolve_executable(cfg)?;

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
        .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
        .window_size(cfg.window_width, cfg.window_height)
        .user_data_dir(storage);

    builder = if cfg.headless {
        builder.headless_mode(HeadlessMode::New)
    } else {
        builder.with_head()
    };
    if cfg.disable_chrome_sandbox {
        builder = builder.no_sandbox();
    }
    builder = builder.args(isolation_args(cfg));
    if let Some(executable) = executable {
        builder = builder.chrome_executable(executable);
    }

    builder.build().map_err(SandboxError::Config)
}
