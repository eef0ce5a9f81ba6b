use thiserror::Error;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Raised when an agent task is malformed or missing required fields.
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),

    /// Raised when the language-model boundary fails (transport, HTTP status, empty body).
    #[error("llm request failed: {0}")]
    Llm(String),

    /// Raised when the browser surface rejects an operation.
    #[error("browser operation failed: {0}")]
    Browser(String),

    /// Raised when the model answers with something that is not a usable step decision.
    #[error("malformed agent output: {0}")]
    MalformedOutput(String),

    /// Raised when the loop gives up after repeated step failures.
    #[error("agent aborted after {count} consecutive failures; last error: {last}")]
    TooManyFailures { count: u32, last: String },

    /// Raised when the caller cancelled the run.
    #[error("agent run cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedOutput(message.into())
    }

    /// Whether the loop may keep going after this error on a single step.
    pub fn is_step_recoverable(&self) -> bool {
        matches!(self, Self::Browser(_) | Self::MalformedOutput(_))
    }
}
