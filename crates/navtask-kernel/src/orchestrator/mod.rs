//! Task execution: resolve the model, provision a sandbox, dispatch the
//! agent under a deadline, normalize what comes back and always release the
//! sandbox before the response is built.

pub mod cleanup;
pub mod deadline;
pub mod dispatcher;
pub mod normalizer;

use std::sync::Arc;

use agent_core::{BrowserAgent, LoopAgent};
use serde_json::json;
use tracing::{info, warn};

use crate::errors::TaskError;
use crate::llm::{ModelResolver, ModelSelector};
use crate::sandbox::{ChromeSandboxProvider, SandboxProvider};
use crate::settings::{Credentials, Settings};
use crate::task::{TaskRequest, TaskResponse, TaskSpec};
use crate::trace::TaskTrace;

pub use cleanup::SandboxGuard;
pub use deadline::{govern, resolve_deadline, AgentFailure, DeadlineChoice, ExecutionOutcome};
pub use dispatcher::{build_prompt, dispatch, AgentHandle};
pub use normalizer::{normalize, Normalized, NormalizedResult};

/// Runs tasks. Cheap to clone; every task gets its own sandbox.
#[derive(Clone)]
pub struct Orchestrator {
    settings: Arc<Settings>,
    resolver: Arc<dyn ModelResolver>,
    provider: Arc<dyn SandboxProvider>,
    agent: Arc<dyn BrowserAgent>,
}

impl Orchestrator {
    pub fn new(
        settings: Arc<Settings>,
        resolver: Arc<dyn ModelResolver>,
        provider: Arc<dyn SandboxProvider>,
        agent: Arc<dyn BrowserAgent>,
    ) -> Self {
        Self {
            settings,
            resolver,
            provider,
            agent,
        }
    }

    /// Production wiring: chat-completions clients, Chromium sandboxes and
    /// the observe-think-act agent loop.
    pub fn from_settings(settings: Arc<Settings>, credentials: Credentials) -> Self {
        let resolver = Arc::new(ModelSelector::new(credentials, settings.llm.clone()));
        let provider = Arc::new(ChromeSandboxProvider::new(settings.sandbox.clone()));
        let agent = Arc::new(LoopAgent::new(settings.agent.clone()));
        Self::new(settings, resolver, provider, agent)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Execute one task end to end.
    ///
    /// Only request validation, model resolution and provisioning fail with
    /// `Err`; every later problem is reported inside the response.
    pub async fn run(
        &self,
        request: TaskRequest,
        role: Option<&str>,
    ) -> Result<TaskResponse, TaskError> {
        let spec = TaskSpec::from_request(&request, &self.settings)?;
        let mut trace = TaskTrace::new(&spec.id);
        info!(
            target: "navtask::task",
            task_id = %spec.id,
            url = %spec.url,
            role = role.unwrap_or("-"),
            "task started"
        );
        trace.info(
            format!("task started for {}", spec.url),
            Some(json!({
                "task": spec.description,
                "model": spec.model,
                "timeout": request.timeout,
                "role": role,
            })),
        );
        if spec.deadline_substituted {
            trace.warn(
                "invalid timeout replaced with default",
                Some(json!({
                    "requested": request.timeout,
                    "applied_secs": spec.deadline.as_secs_f64(),
                })),
            );
        } else if request.timeout.is_none() {
            trace.info(
                "no timeout supplied; using default",
                Some(json!({ "applied_secs": spec.deadline.as_secs_f64() })),
            );
        }

        let llm = match self.resolver.resolve(&spec.model) {
            Ok(llm) => llm,
            Err(err) => {
                trace.error(format!("model resolution failed: {err}"), None);
                return Err(err.into());
            }
        };

        let sandbox = match self.provider.provision(&spec.id).await {
            Ok(sandbox) => sandbox,
            Err(err) => {
                trace.error(format!("sandbox provisioning failed: {err}"), None);
                return Err(err.into());
            }
        };
        trace.info(
            "sandbox provisioned",
            Some(json!({
                "sandbox_id": sandbox.id(),
                "storage": sandbox.storage_path().display().to_string(),
            })),
        );
        let driver = sandbox.driver();
        let mut guard = SandboxGuard::new(sandbox);

        let handle = dispatch(&spec, self.agent.clone(), driver, llm, &mut trace);
        let outcome = govern(handle, spec.deadline, self.settings.abandon_grace()).await;
        record_outcome(&mut trace, &outcome);

        let report = guard.release().await;
        for warning in &report.warnings {
            trace.warn(format!("cleanup warning: {warning}"), None);
        }
        trace.info("sandbox released", Some(json!({ "performed": report.performed })));

        let Normalized {
            result,
            status,
            error,
        } = normalize(&outcome);
        match &outcome {
            ExecutionOutcome::Failed(failure) => {
                trace.set_failure(failure.message.clone(), Some(failure.traceback()))
            }
            ExecutionOutcome::TimedOut(_) => {
                trace.set_failure(error.clone().unwrap_or_default(), None)
            }
            ExecutionOutcome::Completed(_) => {}
        }
        info!(
            target: "navtask::task",
            task_id = %spec.id,
            status = status.as_str(),
            "task finished"
        );

        Ok(TaskResponse {
            task_id: spec.id.clone(),
            status,
            result: result.into_value(),
            error,
            debug_info: spec.debug.then(|| trace.finish(Some(&spec))),
        })
    }
}

fn record_outcome(trace: &mut TaskTrace, outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Completed(text) => trace.info(
            "agent completed",
            Some(json!({ "result_chars": text.chars().count() })),
        ),
        ExecutionOutcome::TimedOut(deadline) => {
            warn!(target: "navtask::task", task_id = %trace.task_id(), "task timed out");
            trace.error(
                format!("agent timed out after {:.1}s", deadline.as_secs_f64()),
                None,
            )
        }
        ExecutionOutcome::Failed(failure) => trace.error(
            format!("agent failed: {}", failure.message),
            Some(json!({ "chain": failure.chain })),
        ),
    }
}
