use thiserror::Error;

/// Failures while creating or driving a sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The per-task storage directory could not be created.
    #[error("failed to create sandbox storage under {root}: {source}")]
    Storage {
        root: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chrome executable not found at {0}; set NAVTASK_CHROME to the full path of chrome/chromium")]
    ExecutableMissing(String),

    #[error("invalid browser configuration: {0}")]
    Config(String),

    #[error("failed to launch chromium: {0}")]
    Launch(String),

    /// A page-level command (navigation, evaluation, screenshot) failed.
    #[error("page operation failed: {0}")]
    Page(String),
}

impl SandboxError {
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page(message.into())
    }
}

impl From<chromiumoxide::error::CdpError> for SandboxError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Page(err.to_string())
    }
}
