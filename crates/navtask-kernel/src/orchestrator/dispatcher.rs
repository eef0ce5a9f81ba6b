use std::sync::Arc;

use agent_core::{AgentError, AgentRunOutput, AgentTask, BrowserAgent, LlmClient, PageDriver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::task::TaskSpec;
use crate::trace::{TaskTrace, TraceLevel};

/// Running agent operation.
#[derive(Debug)]
pub struct AgentHandle {
    pub join: JoinHandle<Result<AgentRunOutput, AgentError>>,
    pub cancel: CancellationToken,
}

/// Instruction text handed to the agent.
///
/// The load-wait block is only present for a positive hint.
pub fn build_prompt(url: &str, description: &str, load_wait_secs: i64) -> String {
    let mut prompt = format!("Open {url} in the browser before doing anything else.\n\n");
    if load_wait_secs > 0 {
        prompt.push_str(&format!(
            "TECHNICAL INSTRUCTIONS:\n\
             - The page may populate its content asynchronously after the initial load.\n\
             - After opening the page, wait {load_wait_secs} seconds before interacting with it or extracting data.\n\
             - If the expected content is still missing, wait again before concluding it is absent.\n\n"
        ));
    }
    prompt.push_str("TASK:\n");
    prompt.push_str(description);
    prompt
}

/// Start `agent` for `spec` on its own tokio task and return immediately.
pub fn dispatch(
    spec: &TaskSpec,
    agent: Arc<dyn BrowserAgent>,
    driver: Arc<dyn PageDriver>,
    llm: Arc<dyn LlmClient>,
    trace: &mut TaskTrace,
) -> AgentHandle {
    let cancel = CancellationToken::new();
    let prompt = build_prompt(&spec.url, &spec.description, spec.load_wait_secs);
    trace.record(
        TraceLevel::Debug,
        "agent prompt built",
        Some(serde_json::json!({ "full_task": prompt })),
    );
    let task = AgentTask::new(spec.id.clone(), prompt);
    info!(
        target: "navtask::task",
        task_id = %spec.id,
        model = %llm.model(),
        "agent dispatched"
    );
    let token = cancel.clone();
    let join = tokio::spawn(async move { agent.run(task, driver, llm, token).await });
    AgentHandle { join, cancel }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_wait_block_for_positive_hint() {
        let prompt = build_prompt("https://example.com", "List the headlines", 10);
        assert!(prompt.starts_with("Open https://example.com"));
        assert!(prompt.contains("TECHNICAL INSTRUCTIONS:"));
        assert!(prompt.contains("wait 10 seconds"));
        assert!(prompt.ends_with("TASK:\nList the headlines"));
    }

    #[test]
    fn prompt_skips_wait_block_otherwise() {
        for hint in [0, -4] {
            let prompt = build_prompt("https://example.com", "x", hint);
            assert!(!prompt.contains("TECHNICAL INSTRUCTIONS"));
            assert!(prompt.contains("TASK:\nx"));
        }
    }

    #[test]
    fn description_is_kept_verbatim() {
        let description = "  Extract {\"json\"}\n as a list  ";
        let prompt = build_prompt("https://a", description, 0);
        assert!(prompt.ends_with(description));
    }
}
