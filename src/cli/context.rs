use std::path::{Path, PathBuf};
use std::sync::Arc;

use navtask_kernel::{BrowserDiagnostics, Credentials, Orchestrator, Settings};

/// Everything a command needs, built once from configuration and environment.
pub struct CliContext {
    settings: Arc<Settings>,
    credentials: Credentials,
    config_path: Option<PathBuf>,
}

impl CliContext {
    pub fn new(settings: Settings, credentials: Credentials, config_path: Option<PathBuf>) -> Self {
        Self {
            settings: Arc::new(settings),
            credentials,
            config_path,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings.as_ref()
    }

    pub fn shared_settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// File the settings were read from, `None` when running on defaults.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::from_settings(self.shared_settings(), self.credentials.clone())
    }

    pub fn diagnostics(&self) -> BrowserDiagnostics {
        BrowserDiagnostics::from_settings(&self.settings)
    }
}
