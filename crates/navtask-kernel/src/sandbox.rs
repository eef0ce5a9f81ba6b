use std::path::Path;
use std::sync::Arc;

use agent_core::PageDriver;
use async_trait::async_trait;
use browser_sandbox::{ChromeSandbox, ReleaseReport, SandboxConfig};

use crate::errors::ProvisionError;

/// An isolated environment owned by exactly one task.
#[async_trait]
pub trait TaskSandbox: Send + Sync {
    fn id(&self) -> &str;

    fn storage_path(&self) -> &Path;

    fn driver(&self) -> Arc<dyn PageDriver>;

    /// Terminate the browser and remove storage. Must be idempotent and must
    /// not fail; problems come back as warnings.
    async fn release(&self) -> ReleaseReport;
}

#[async_trait]
pub trait SandboxProvider: Send + Sync {
    async fn provision(&self, task_id: &str) -> Result<Box<dyn TaskSandbox>, ProvisionError>;
}

#[async_trait]
impl TaskSandbox for ChromeSandbox {
    fn id(&self) -> &str {
        ChromeSandbox::id(self)
    }

    fn storage_path(&self) -> &Path {
        ChromeSandbox::storage_path(self)
    }

    fn driver(&self) -> Arc<dyn PageDriver> {
        ChromeSandbox::driver(self)
    }

    async fn release(&self) -> ReleaseReport {
        ChromeSandbox::release(self).await
    }
}

/// Launches a fresh Chromium sandbox per task.
#[derive(Debug, Clone)]
pub struct ChromeSandboxProvider {
    config: SandboxConfig,
}

impl ChromeSandboxProvider {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Launch without boxing, for callers that need the Chromium helpers.
    pub async fn launch(&self, task_id: &str) -> Result<ChromeSandbox, ProvisionError> {
        ChromeSandbox::launch(&self.config, task_id)
            .await
            .map_err(|err| ProvisionError::new(task_id, err.to_string()))
    }
}

#[async_trait]
impl SandboxProvider for ChromeSandboxProvider {
    async fn provision(&self, task_id: &str) -> Result<Box<dyn TaskSandbox>, ProvisionError> {
        Ok(Box::new(self.launch(task_id).await?))
    }
}
