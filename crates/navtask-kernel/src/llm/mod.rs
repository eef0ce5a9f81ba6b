//! Model selection: map a requested model name to a configured client.

pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use agent_core::LlmClient;
use tracing::debug;

use crate::errors::ConfigError;
use crate::settings::{Credentials, LlmSettings};

pub use openai::{ChatCompletionsClient, ChatCompletionsConfig};

/// Provider family a model name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    DeepSeek,
    OpenAi,
    Unknown,
}

impl ModelFamily {
    /// Case-insensitive classification by name.
    ///
    /// `deepseek` anywhere in the name wins; OpenAI models are recognised by
    /// `gpt`, `chatgpt`, `openai` or an `o1`/`o3`/`o4` prefix.
    pub fn classify(model: &str) -> Self {
        let lower = model.trim().to_ascii_lowercase();
        if lower.contains("deepseek") {
            return ModelFamily::DeepSeek;
        }
        if lower.contains("gpt")
            || lower.contains("openai")
            || ["o1", "o3", "o4"].iter().any(|p| lower.starts_with(p))
        {
            return ModelFamily::OpenAi;
        }
        ModelFamily::Unknown
    }

    /// Environment variable holding this family's key.
    pub fn credential(&self) -> Option<&'static str> {
        match self {
            ModelFamily::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ModelFamily::OpenAi => Some("OPENAI_API_KEY"),
            ModelFamily::Unknown => None,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            ModelFamily::DeepSeek => "DeepSeek",
            ModelFamily::OpenAi => "OpenAI",
            ModelFamily::Unknown => "unknown",
        }
    }
}

/// Resolves a model name into a ready client.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, model: &str) -> Result<Arc<dyn LlmClient>, ConfigError>;
}

/// Default resolver backed by [`Credentials`] and [`LlmSettings`].
#[derive(Debug, Clone)]
pub struct ModelSelector {
    credentials: Credentials,
    llm: LlmSettings,
}

impl ModelSelector {
    pub fn new(credentials: Credentials, llm: LlmSettings) -> Self {
        Self { credentials, llm }
    }

    /// Client configuration for `model`, validating the credential first.
    pub fn client_config(&self, model: &str) -> Result<ChatCompletionsConfig, ConfigError> {
        let family = ModelFamily::classify(model);
        let (keys, api_base) = match family {
            ModelFamily::DeepSeek => (
                self.credentials.deepseek_api_keys(),
                &self.llm.deepseek_api_base,
            ),
            ModelFamily::OpenAi => (
                self.credentials.openai_api_keys(),
                &self.llm.openai_api_base,
            ),
            ModelFamily::Unknown => return Err(ConfigError::UnknownModel(model.to_string())),
        };
        if keys.is_empty() {
            return Err(ConfigError::MissingCredential {
                credential: family.credential().unwrap_or("API key"),
                model: model.to_string(),
            });
        }
        Ok(ChatCompletionsConfig {
            provider: family.provider_name(),
            api_keys: keys.to_vec(),
            model: model.trim().to_string(),
            api_base: api_base.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_secs(self.llm.request_timeout_secs),
        })
    }
}

impl ModelResolver for ModelSelector {
    fn resolve(&self, model: &str) -> Result<Arc<dyn LlmClient>, ConfigError> {
        let config = self.client_config(model)?;
        debug!(target: "llm", provider = config.provider, model = %config.model, "model resolved");
        let client =
            ChatCompletionsClient::new(config).map_err(|err| ConfigError::Client(err.to_string()))?;
        Ok(Arc::new(client))
    }
}
