use browser_sandbox::ReleaseReport;
use tracing::{info, warn};

use crate::sandbox::TaskSandbox;

/// Owns a task's sandbox until it is released.
///
/// [`SandboxGuard::release`] is the normal path. If the guard is dropped
/// first (the task future was cancelled or panicked) the release is spawned
/// on the current runtime instead.
pub struct SandboxGuard {
    sandbox: Option<Box<dyn TaskSandbox>>,
}

impl SandboxGuard {
    pub fn new(sandbox: Box<dyn TaskSandbox>) -> Self {
        Self {
            sandbox: Some(sandbox),
        }
    }

    /// Release the sandbox. Later calls are no-ops.
    pub async fn release(&mut self) -> ReleaseReport {
        let Some(sandbox) = self.sandbox.take() else {
            return ReleaseReport::default();
        };
        let report = sandbox.release().await;
        for warning in &report.warnings {
            warn!(target: "navtask::task", sandbox = %sandbox.id(), "cleanup: {warning}");
        }
        info!(
            target: "navtask::task",
            sandbox = %sandbox.id(),
            performed = report.performed,
            "sandbox cleanup finished"
        );
        report
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        let Some(sandbox) = self.sandbox.take() else {
            return;
        };
        warn!(
            target: "navtask::task",
            sandbox = %sandbox.id(),
            "sandbox guard dropped before release; releasing in background"
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    sandbox.release().await;
                });
            }
            Err(_) => warn!(target: "navtask::task", "no runtime available to release sandbox"),
        }
    }
}
