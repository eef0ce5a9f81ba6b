//! Configuration for agent loop execution mode.

use serde::{Deserialize, Serialize};

/// Configuration for the agent loop (observe-think-act) execution mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLoopConfig {
    /// Maximum iterations before forcing stop.
    /// Default: 50
    pub max_steps: u32,

    /// Maximum actions per step.
    /// Default: 3
    pub max_actions_per_step: u32,

    /// Consecutive failures before aborting the loop.
    /// Default: 3
    pub max_consecutive_failures: u32,

    /// Maximum number of elements to index for the LLM.
    /// Default: 300
    pub max_elements: u32,

    /// Maximum text length per element in the tree.
    /// Default: 100
    pub max_element_text_length: u32,

    /// Maximum characters returned by `extract_content`.
    /// Default: 8000
    pub max_extract_chars: usize,

    /// Number of past steps replayed to the model.
    /// Default: 10
    pub history_window: usize,

    /// Minimum wait between actions in milliseconds.
    /// Default: 100
    pub wait_between_actions_ms: u64,

    /// Upper bound for a single `wait` action in milliseconds.
    /// Default: 30000
    pub max_wait_ms: u64,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            max_actions_per_step: 3,
            max_consecutive_failures: 3,
            max_elements: 300,
            max_element_text_length: 100,
            max_extract_chars: 8_000,
            history_window: 10,
            wait_between_actions_ms: 100,
            max_wait_ms: 30_000,
        }
    }
}

impl AgentLoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal config for testing.
    pub fn minimal() -> Self {
        Self {
            max_steps: 5,
            max_actions_per_step: 1,
            max_consecutive_failures: 2,
            max_elements: 50,
            max_element_text_length: 50,
            max_extract_chars: 500,
            history_window: 3,
            wait_between_actions_ms: 0,
            max_wait_ms: 1_000,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: AgentLoopConfig = serde_json::from_str(r#"{"max_steps": 7}"#).unwrap();
        assert_eq!(config.max_steps, 7);
        assert_eq!(config.max_actions_per_step, 3);
        assert_eq!(config.history_window, 10);
    }
}
