//! Agent Loop Controller - main orchestration for the observe-think-act cycle.
//!
//! The LLM is consulted at each step to decide the next actions based on the
//! current browser state. The controller owns no browser or model itself; both
//! are passed in per run so a single controller can serve many tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::AgentLoopConfig;
use super::prompt::{format_system_prompt, format_user_message};
use super::types::{
    aggregate_action_results, AgentAction, AgentActionResult, AgentActionType, AgentHistoryEntry,
    AgentOutput, ScrollDirection,
};
use crate::agent::{AgentHistory, AgentRunOutput, AgentTask, BrowserAgent};
use crate::driver::PageDriver;
use crate::errors::AgentError;
use crate::json::extract_json_object;
use crate::llm_provider::{ChatMessage, LlmClient};

/// Outcome of a `done` action.
#[derive(Debug, Clone)]
struct DoneResult {
    success: bool,
    text: String,
}

/// Result of a single step execution.
#[derive(Debug)]
struct StepResult {
    history_entry: AgentHistoryEntry,
    done: Option<DoneResult>,
}

/// Controller for the agent loop execution.
#[derive(Debug, Clone, Default)]
pub struct AgentLoopController {
    config: AgentLoopConfig,
}

impl AgentLoopController {
    pub fn new(config: AgentLoopConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }

    /// Run the loop until the model calls `done`, the step budget runs out, or
    /// a fatal error occurs.
    ///
    /// Exhausting `max_steps` is not an error: the returned history simply has
    /// no final result.
    pub async fn run(
        &self,
        task: &AgentTask,
        driver: &dyn PageDriver,
        llm: &dyn LlmClient,
        cancel: &CancellationToken,
    ) -> Result<AgentHistory, AgentError> {
        if task.instruction.trim().is_empty() {
            return Err(AgentError::invalid_request("task instruction is empty"));
        }

        let started = Instant::now();
        let system = ChatMessage::system(format_system_prompt());
        let mut history = AgentHistory::default();
        let mut consecutive_failures = 0u32;

        for step_number in 1..=self.config.max_steps {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let step = self
                .execute_step(step_number, task, &system, &history.steps, driver, llm, cancel)
                .await;

            match step {
                Ok(step) => {
                    if step.history_entry.result.success {
                        consecutive_failures = 0;
                    } else {
                        consecutive_failures += 1;
                    }
                    let failure = step.history_entry.result.error_message.clone();
                    history.steps.push(step.history_entry);

                    if let Some(done) = step.done {
                        info!(
                            task_id = %task.task_id,
                            step = step_number,
                            success = done.success,
                            "agent finished"
                        );
                        history.final_text = Some(done.text);
                        history.success = Some(done.success);
                        break;
                    }
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(AgentError::TooManyFailures {
                            count: consecutive_failures,
                            last: failure.unwrap_or_default(),
                        });
                    }
                }
                Err(err) if err.is_step_recoverable() => {
                    consecutive_failures += 1;
                    warn!(
                        task_id = %task.task_id,
                        step = step_number,
                        failures = consecutive_failures,
                        error = %err,
                        "agent step failed"
                    );
                    let last = err.to_string();
                    history
                        .steps
                        .push(AgentHistoryEntry::error(step_number, last.clone()));
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(AgentError::TooManyFailures {
                            count: consecutive_failures,
                            last,
                        });
                    }
                }
                Err(err) => return Err(err),
            }
        }

        if !history.is_done() {
            warn!(
                task_id = %task.task_id,
                max_steps = self.config.max_steps,
                "agent reached step limit without a result"
            );
        }
        history.total_time_ms = started.elapsed().as_millis() as u64;
        Ok(history)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_step(
        &self,
        step_number: u32,
        task: &AgentTask,
        system: &ChatMessage,
        history: &[AgentHistoryEntry],
        driver: &dyn PageDriver,
        llm: &dyn LlmClient,
        cancel: &CancellationToken,
    ) -> Result<StepResult, AgentError> {
        // 1. Observe
        let state = driver
            .observe(
                self.config.max_elements,
                self.config.max_element_text_length,
            )
            .await?;

        // 2. Think
        let user = ChatMessage::user(format_user_message(
            &task.instruction,
            &state,
            history,
            self.config.history_window,
        ));
        let messages = [system.clone(), user];
        let raw = tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            out = llm.generate(&messages) => out?,
        };
        let output = parse_agent_output(&raw)?;
        debug!(
            task_id = %task.task_id,
            step = step_number,
            next_goal = %output.next_goal,
            actions = output.actions.len(),
            "agent decided"
        );

        // 3. Act
        let mut results = Vec::new();
        let mut done = None;
        let max_actions = self.config.max_actions_per_step.max(1) as usize;

        for (i, action) in output.actions.iter().take(max_actions).enumerate() {
            if action.action_type == AgentActionType::Done {
                done = Some(DoneResult {
                    success: action
                        .params
                        .done_success
                        .or(action.params.success)
                        .unwrap_or(false),
                    text: action.params.done_text.clone().unwrap_or_default(),
                });
                break;
            }

            let result = match self.execute_action(action, driver, cancel).await {
                Ok(result) => result,
                Err(err) if err.is_step_recoverable() => AgentActionResult::failure(err.to_string()),
                Err(err) => return Err(err),
            };
            let failed = !result.success;
            results.push(result);
            if failed {
                break;
            }

            if i + 1 < output.actions.len() && self.config.wait_between_actions_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.wait_between_actions_ms))
                    .await;
            }
        }

        let result = if results.is_empty() {
            AgentActionResult::ok(false)
        } else {
            aggregate_action_results(&results)
        };

        Ok(StepResult {
            history_entry: AgentHistoryEntry::from_output(
                step_number,
                state.headline(),
                &output,
                result,
            ),
            done,
        })
    }

    async fn execute_action(
        &self,
        action: &AgentAction,
        driver: &dyn PageDriver,
        cancel: &CancellationToken,
    ) -> Result<AgentActionResult, AgentError> {
        let params = &action.params;
        match action.action_type {
            AgentActionType::Navigate => {
                let Some(url) = params.url.as_deref() else {
                    return Ok(AgentActionResult::failure("navigate requires url"));
                };
                driver.navigate(url).await?;
                Ok(AgentActionResult::ok(true))
            }
            AgentActionType::Click => {
                let Some(idx) = action.element_index else {
                    return Ok(AgentActionResult::failure("click requires element_index"));
                };
                driver.click(idx).await?;
                Ok(AgentActionResult::ok(true))
            }
            AgentActionType::TypeText => {
                let (Some(idx), Some(text)) = (action.element_index, params.text.as_deref()) else {
                    return Ok(AgentActionResult::failure(
                        "type_text requires element_index and text",
                    ));
                };
                let submit = params.submit.unwrap_or(false);
                driver.type_text(idx, text, submit).await?;
                Ok(AgentActionResult::ok(submit))
            }
            AgentActionType::Select => {
                let (Some(idx), Some(value)) = (action.element_index, params.value.as_deref())
                else {
                    return Ok(AgentActionResult::failure(
                        "select requires element_index and value",
                    ));
                };
                driver.select_option(idx, value).await?;
                Ok(AgentActionResult::ok(true))
            }
            AgentActionType::Scroll => {
                let direction = params.direction.unwrap_or(ScrollDirection::Down);
                driver.scroll(direction, params.amount.unwrap_or(600)).await?;
                Ok(AgentActionResult::ok(true))
            }
            AgentActionType::GoBack => {
                driver.go_back().await?;
                Ok(AgentActionResult::ok(true))
            }
            AgentActionType::Wait => {
                let ms = params.ms.unwrap_or(1_000).min(self.config.max_wait_ms);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                }
                Ok(AgentActionResult::ok(false))
            }
            AgentActionType::ExtractContent => {
                let text = driver.extract_text(self.config.max_extract_chars).await?;
                Ok(AgentActionResult {
                    extracted_content: Some(text),
                    ..AgentActionResult::ok(false)
                })
            }
            AgentActionType::Done => Ok(AgentActionResult::ok(false)),
        }
    }
}

/// Parse the model's step decision, tolerating prose or fences around the JSON.
pub(crate) fn parse_agent_output(raw: &str) -> Result<AgentOutput, AgentError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| AgentError::malformed("response contains no JSON object"))?;
    let output: AgentOutput =
        serde_json::from_str(&json).map_err(|err| AgentError::malformed(err.to_string()))?;
    if output.actions.is_empty() {
        return Err(AgentError::malformed("response contains no actions"));
    }
    Ok(output)
}

/// [`BrowserAgent`] backed by the observe-think-act loop.
#[derive(Debug, Clone, Default)]
pub struct LoopAgent {
    controller: AgentLoopController,
}

impl LoopAgent {
    pub fn new(config: AgentLoopConfig) -> Self {
        Self {
            controller: AgentLoopController::new(config),
        }
    }
}

#[async_trait]
impl BrowserAgent for LoopAgent {
    async fn run(
        &self,
        task: AgentTask,
        driver: Arc<dyn PageDriver>,
        llm: Arc<dyn LlmClient>,
        cancel: CancellationToken,
    ) -> Result<AgentRunOutput, AgentError> {
        self.controller
            .run(&task, driver.as_ref(), llm.as_ref(), &cancel)
            .await
            .map(AgentRunOutput::History)
    }
}
