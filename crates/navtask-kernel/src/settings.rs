use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use agent_core::AgentLoopConfig;
use browser_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ConfigError;

pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LOAD_WAIT_SECS: i64 = 5;

/// Process-wide configuration. Built once at startup and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub defaults: TaskDefaults,
    pub llm: LlmSettings,
    pub sandbox: SandboxConfig,
    pub agent: AgentLoopConfig,
    /// Directory for the diagnostic log and diagnosis screenshots.
    pub log_dir: PathBuf,
    /// `production` disables the development API key.
    pub environment: String,
    /// How long a timed-out agent gets to observe cancellation before it is abandoned.
    pub abandon_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDefaults {
    pub model: String,
    pub timeout_secs: u64,
    pub load_wait_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub openai_api_base: String,
    pub deepseek_api_base: String,
    pub request_timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            defaults: TaskDefaults::default(),
            llm: LlmSettings::default(),
            sandbox: SandboxConfig::default(),
            agent: AgentLoopConfig::default(),
            log_dir: PathBuf::from("logs"),
            environment: "production".to_string(),
            abandon_grace_ms: 2_000,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            load_wait_secs: DEFAULT_LOAD_WAIT_SECS,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            openai_api_base: "https://api.openai.com/v1".to_string(),
            deepseek_api_base: "https://api.deepseek.com/v1".to_string(),
            request_timeout_secs: 120,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

impl Settings {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.timeout_secs)
    }

    pub fn abandon_grace(&self) -> Duration {
        Duration::from_millis(self.abandon_grace_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn diag_log_path(&self) -> PathBuf {
        self.log_dir.join("task_diag.log")
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = read("NAVTASK_CHROME") {
            self.sandbox.executable = Some(PathBuf::from(path));
        }
        if let Some(raw) = read("NAVTASK_HEADLESS") {
            match parse_flag(&raw) {
                Some(flag) => self.sandbox.headless = flag,
                None => warn!(value = %raw, "invalid NAVTASK_HEADLESS value"),
            }
        }
        if let Some(raw) = read("NAVTASK_DISABLE_SANDBOX") {
            match parse_flag(&raw) {
                Some(flag) => self.sandbox.disable_chrome_sandbox = flag,
                None => warn!(value = %raw, "invalid NAVTASK_DISABLE_SANDBOX value"),
            }
        }
        if let Some(root) = read("NAVTASK_SANDBOX_ROOT") {
            self.sandbox.storage_root = PathBuf::from(root);
        }
        if let Some(dir) = read("NAVTASK_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(base) = read("OPENAI_API_BASE") {
            self.llm.openai_api_base = base;
        }
        if let Some(base) = read("DEEPSEEK_API_BASE") {
            self.llm.deepseek_api_base = base;
        }
        if let Some(environment) = read("ENVIRONMENT") {
            self.environment = environment;
        }
    }

    /// Reject values that would make every task fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "defaults.timeout_secs must be positive".into(),
            ));
        }
        if self.defaults.model.trim().is_empty() {
            return Err(ConfigError::Invalid("defaults.model must not be empty".into()));
        }
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Invalid("agent.max_steps must be positive".into()));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Secrets read once at startup.
///
/// Provider keys accept a comma separated list; the chat client rotates to
/// the next key when one is rate limited.
#[derive(Clone, Default)]
pub struct Credentials {
    openai_api_keys: Vec<String>,
    deepseek_api_keys: Vec<String>,
    api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_keys", &self.openai_api_keys.len())
            .field("deepseek_api_keys", &self.deepseek_api_keys.len())
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            openai_api_keys: split_keys(lookup("OPENAI_API_KEY")),
            deepseek_api_keys: split_keys(lookup("DEEPSEEK_API_KEY")),
            api_key: lookup("API_KEY")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        }
    }

    pub fn openai_api_keys(&self) -> &[String] {
        &self.openai_api_keys
    }

    pub fn deepseek_api_keys(&self) -> &[String] {
        &self.deepseek_api_keys
    }

    /// Key granting the admin role on the serve surface.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

fn split_keys(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Show only the first five characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(5).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_service_contract() {
        let settings = Settings::default();
        assert_eq!(settings.defaults.model, "gpt-4.1");
        assert_eq!(settings.default_timeout(), Duration::from_secs(300));
        assert_eq!(settings.defaults.load_wait_secs, 5);
        assert_eq!(settings.llm.temperature, 0.0);
        assert_eq!(settings.llm.max_tokens, 4096);
        assert!(settings.is_production());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "defaults:\n  timeout_secs: 60\nsandbox:\n  headless: false\n";
        let settings: Settings = serde_yaml::from_str(yaml).expect("yaml");
        assert_eq!(settings.defaults.timeout_secs, 60);
        assert_eq!(settings.defaults.model, "gpt-4.1");
        assert!(!settings.sandbox.headless);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn env_overrides_apply_and_ignore_bad_flags() {
        let mut settings = Settings::default();
        settings.apply_overrides_from(lookup(&[
            ("NAVTASK_HEADLESS", "maybe"),
            ("NAVTASK_DISABLE_SANDBOX", "true"),
            ("NAVTASK_LOG_DIR", "/var/log/navtask"),
            ("ENVIRONMENT", "development"),
            ("OPENAI_API_BASE", "  "),
        ]));
        assert!(settings.sandbox.headless);
        assert!(settings.sandbox.disable_chrome_sandbox);
        assert_eq!(settings.log_dir, PathBuf::from("/var/log/navtask"));
        assert!(!settings.is_production());
        assert_eq!(settings.llm.openai_api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn zero_default_timeout_is_invalid() {
        let mut settings = Settings::default();
        settings.defaults.timeout_secs = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn credentials_split_key_lists() {
        let creds = Credentials::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-one, sk-two,,"),
            ("API_KEY", " "),
        ]));
        assert_eq!(creds.openai_api_keys(), ["sk-one", "sk-two"]);
        assert!(creds.deepseek_api_keys().is_empty());
        assert_eq!(creds.api_key(), None);
        assert!(!format!("{creds:?}").contains("sk-one"));
    }

    #[test]
    fn masking_keeps_short_prefix() {
        assert_eq!(mask_secret("abcdefgh"), "abcde...");
        assert_eq!(mask_secret("ab"), "ab...");
    }
}
