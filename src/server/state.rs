use std::path::PathBuf;
use std::sync::Arc;

use navtask_kernel::{BrowserDiagnostics, Orchestrator};

#[derive(Clone)]
pub struct ServeState {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) diagnostics: Arc<BrowserDiagnostics>,
    pub(crate) environment: String,
    /// File served by `/view_logs`.
    pub(crate) diag_log: PathBuf,
}

impl ServeState {
    pub fn new(
        orchestrator: Orchestrator,
        diagnostics: BrowserDiagnostics,
        environment: impl Into<String>,
        diag_log: PathBuf,
    ) -> Self {
        Self {
            orchestrator,
            diagnostics: Arc::new(diagnostics),
            environment: environment.into(),
            diag_log,
        }
    }
}
