//! Errors that abort a task before or while its sandbox is provisioned.
//!
//! Everything that happens after the agent has been dispatched (timeouts,
//! agent failures, unparseable results) is reported inside the task response
//! instead; see [`crate::orchestrator`].

use thiserror::Error;

/// Process configuration is unusable for the requested task.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{credential} is not configured; required for model '{model}'")]
    MissingCredential {
        credential: &'static str,
        model: String,
    },

    #[error("unsupported model '{0}'; expected a DeepSeek or OpenAI model name")]
    UnknownModel(String),

    #[error("failed to load configuration from {path}: {message}")]
    File { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to build language-model client: {0}")]
    Client(String),
}

/// The isolated browser environment could not be created.
#[derive(Debug, Error)]
#[error("failed to provision sandbox for {task_id}: {message}")]
pub struct ProvisionError {
    pub task_id: String,
    pub message: String,
}

impl ProvisionError {
    pub fn new(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            message: message.into(),
        }
    }
}

/// Fatal task errors surfaced to the transport layer.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("invalid task request: {0}")]
    InvalidRequest(String),
}

impl TaskError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status the serve surface answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            TaskError::Config(_) | TaskError::Provision(_) => 500,
            TaskError::InvalidRequest(_) => 422,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::Config(ConfigError::MissingCredential { .. }) => "config.missing_credential",
            TaskError::Config(ConfigError::UnknownModel(_)) => "config.unknown_model",
            TaskError::Config(_) => "config.invalid",
            TaskError::Provision(_) => "sandbox.provision_failed",
            TaskError::InvalidRequest(_) => "request.invalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_the_variable() {
        let err = TaskError::from(ConfigError::MissingCredential {
            credential: "DEEPSEEK_API_KEY",
            model: "deepseek-chat".into(),
        });
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.code(), "config.missing_credential");
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn provision_and_request_errors_map_to_statuses() {
        let provision = TaskError::from(ProvisionError::new("task_1", "launch failed"));
        assert_eq!(provision.http_status(), 500);
        assert!(provision.to_string().contains("task_1"));

        let invalid = TaskError::invalid_request("url must not be empty");
        assert_eq!(invalid.http_status(), 422);
        assert_eq!(invalid.code(), "request.invalid");
    }
}
