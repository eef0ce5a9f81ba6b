use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for launching sandboxed browsers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Chrome/Chromium binary. `None` means auto-detect at launch.
    pub executable: Option<PathBuf>,
    /// Directory under which per-task storage directories are created.
    pub storage_root: PathBuf,
    pub headless: bool,
    /// Pass `--no-sandbox` to Chromium (required when running as root in containers).
    pub disable_chrome_sandbox: bool,
    pub launch_timeout_ms: u64,
    /// Upper bound for a single CDP request, navigation included.
    pub request_timeout_ms: u64,
    /// How long `release` waits for a graceful browser exit before killing it.
    pub close_timeout_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            executable: None,
            storage_root: std::env::temp_dir(),
            headless: true,
            disable_chrome_sandbox: false,
            launch_timeout_ms: 20_000,
            request_timeout_ms: 30_000,
            close_timeout_ms: 5_000,
            window_width: 1280,
            window_height: 900,
        }
    }
}
