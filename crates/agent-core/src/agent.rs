//! The agent boundary seen by the orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::agent_loop::AgentHistoryEntry;
use crate::driver::PageDriver;
use crate::errors::AgentError;
use crate::llm_provider::LlmClient;

/// Work handed to an agent: an identifier for logging and the full instruction text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    pub task_id: String,
    pub instruction: String,
}

impl AgentTask {
    pub fn new(task_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            instruction: instruction.into(),
        }
    }
}

/// Record of an agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentHistory {
    pub steps: Vec<AgentHistoryEntry>,
    /// Text passed to the final `done` action, if the agent reached one.
    pub final_text: Option<String>,
    /// Success flag reported by the `done` action.
    pub success: Option<bool>,
    pub total_time_ms: u64,
}

impl AgentHistory {
    /// Final extracted result of the run, if any.
    pub fn final_result(&self) -> Option<&str> {
        self.final_text.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.final_text.is_some()
    }

    pub fn is_successful(&self) -> bool {
        self.success.unwrap_or(false)
    }

    pub fn steps_taken(&self) -> usize {
        self.steps.len()
    }
}

/// Representations an agent may hand back.
///
/// Only `History` (via its final-result accessor) and `Text` carry a usable
/// result; callers must reject `Value`.
#[derive(Debug, Clone)]
pub enum AgentRunOutput {
    History(AgentHistory),
    Text(String),
    Value(serde_json::Value),
}

impl AgentRunOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::History(_) => "history",
            Self::Text(_) => "text",
            Self::Value(_) => "value",
        }
    }
}

/// Long-running, cancellable browser agent.
#[async_trait]
pub trait BrowserAgent: Send + Sync {
    async fn run(
        &self,
        task: AgentTask,
        driver: Arc<dyn PageDriver>,
        llm: Arc<dyn LlmClient>,
        cancel: CancellationToken,
    ) -> Result<AgentRunOutput, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_result_reads_done_text() {
        let history = AgentHistory {
            final_text: Some("[{\"a\":1}]".to_string()),
            success: Some(true),
            ..Default::default()
        };
        assert_eq!(history.final_result(), Some("[{\"a\":1}]"));
        assert!(history.is_done());
        assert!(history.is_successful());

        let unfinished = AgentHistory::default();
        assert_eq!(unfinished.final_result(), None);
        assert!(!unfinished.is_successful());
    }
}
