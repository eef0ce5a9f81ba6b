//! Fault-injection tests for the task orchestrator.
//!
//! The sandbox provider, agent and model resolver are replaced with fakes so
//! every exit path can be driven deterministically and the number of sandbox
//! releases counted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_core::{
    AgentError, AgentRunOutput, AgentTask, BrowserAgent, BrowserStateSummary, LlmClient,
    LoopAgent, AgentLoopConfig, PageDriver, ScriptedLlmClient, ScrollDirection,
};
use async_trait::async_trait;
use browser_sandbox::ReleaseReport;
use navtask_kernel::errors::{ConfigError, ProvisionError};
use navtask_kernel::orchestrator::SandboxGuard;
use navtask_kernel::{
    Credentials, ModelResolver, ModelSelector, Orchestrator, SandboxProvider, Settings,
    TaskError, TaskRequest, TaskSandbox, TaskStatus,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

struct NullDriver;

#[async_trait]
impl PageDriver for NullDriver {
    async fn navigate(&self, _: &str) -> Result<(), AgentError> {
        Ok(())
    }

    async fn observe(&self, _: u32, _: u32) -> Result<BrowserStateSummary, AgentError> {
        Ok(BrowserStateSummary {
            url: "https://example.com/".to_string(),
            title: Some("Example".to_string()),
            ..Default::default()
        })
    }

    async fn click(&self, _: u32) -> Result<(), AgentError> {
        Ok(())
    }

    async fn type_text(&self, _: u32, _: &str, _: bool) -> Result<(), AgentError> {
        Ok(())
    }

    async fn select_option(&self, _: u32, _: &str) -> Result<(), AgentError> {
        Ok(())
    }

    async fn scroll(&self, _: ScrollDirection, _: i32) -> Result<(), AgentError> {
        Ok(())
    }

    async fn go_back(&self) -> Result<(), AgentError> {
        Ok(())
    }

    async fn extract_text(&self, _: usize) -> Result<String, AgentError> {
        Ok(String::new())
    }
}

struct FakeSandbox {
    id: String,
    storage: PathBuf,
    released: AtomicBool,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl TaskSandbox for FakeSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_path(&self) -> &Path {
        &self.storage
    }

    fn driver(&self) -> Arc<dyn PageDriver> {
        Arc::new(NullDriver)
    }

    async fn release(&self) -> ReleaseReport {
        if self.released.swap(true, Ordering::SeqCst) {
            return ReleaseReport::default();
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        ReleaseReport {
            performed: true,
            warnings: Vec::new(),
        }
    }
}

#[derive(Default)]
struct FakeProvider {
    fail: bool,
    provisioned: Mutex<Vec<(String, PathBuf)>>,
    releases: Arc<AtomicUsize>,
}

impl FakeProvider {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn provisioned(&self) -> Vec<(String, PathBuf)> {
        self.provisioned.lock().unwrap().clone()
    }

    fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SandboxProvider for FakeProvider {
    async fn provision(&self, task_id: &str) -> Result<Box<dyn TaskSandbox>, ProvisionError> {
        if self.fail {
            return Err(ProvisionError::new(task_id, "chromium failed to start"));
        }
        let mut provisioned = self.provisioned.lock().unwrap();
        let id = format!("navtask-{task_id}-{}", provisioned.len());
        let storage = PathBuf::from("/tmp/fake").join(&id);
        provisioned.push((id.clone(), storage.clone()));
        Ok(Box::new(FakeSandbox {
            id,
            storage,
            released: AtomicBool::new(false),
            releases: self.releases.clone(),
        }))
    }
}

/// Hands out a scripted client for any model name.
struct ScriptedResolver {
    responses: Vec<String>,
}

impl ModelResolver for ScriptedResolver {
    fn resolve(&self, model: &str) -> Result<Arc<dyn LlmClient>, ConfigError> {
        let client = self
            .responses
            .iter()
            .fold(ScriptedLlmClient::new(model), |client, text| client.respond(text.clone()));
        Ok(Arc::new(client))
    }
}

fn resolver() -> Arc<dyn ModelResolver> {
    Arc::new(ScriptedResolver {
        responses: Vec::new(),
    })
}

enum FakeAgent {
    Text(String),
    Fails,
    Panics,
    ReturnsValue,
    /// Stops only when cancelled.
    WaitsForCancel,
    /// Never looks at the cancellation token.
    IgnoresCancel,
}

#[async_trait]
impl BrowserAgent for FakeAgent {
    async fn run(
        &self,
        _task: AgentTask,
        _driver: Arc<dyn PageDriver>,
        _llm: Arc<dyn LlmClient>,
        cancel: CancellationToken,
    ) -> Result<AgentRunOutput, AgentError> {
        match self {
            FakeAgent::Text(text) => Ok(AgentRunOutput::Text(text.clone())),
            FakeAgent::Fails => Err(AgentError::llm("upstream returned 500")),
            FakeAgent::Panics => panic!("agent blew up"),
            FakeAgent::ReturnsValue => Ok(AgentRunOutput::Value(json!({"final": "x"}))),
            FakeAgent::WaitsForCancel => {
                cancel.cancelled().await;
                Err(AgentError::Cancelled)
            }
            FakeAgent::IgnoresCancel => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

fn orchestrator(provider: Arc<FakeProvider>, agent: FakeAgent) -> Orchestrator {
    Orchestrator::new(
        Arc::new(Settings::default()),
        resolver(),
        provider,
        Arc::new(agent),
    )
}

fn request() -> TaskRequest {
    TaskRequest::new("https://example.com", "Return the page heading as JSON")
}

#[tokio::test]
async fn structured_result_completes_and_cleans_up_once() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(
        provider.clone(),
        FakeAgent::Text(r#"[{"heading": "Example Domain"}]"#.into()),
    );

    let response = orch.run(request(), Some("admin")).await.unwrap();

    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.result, Some(json!([{"heading": "Example Domain"}])));
    assert_eq!(response.error, None);
    assert!(response.debug_info.is_none());
    assert!(response.task_id.starts_with("task_"));
    assert_eq!(provider.releases(), 1);
}

#[tokio::test]
async fn unparseable_result_is_wrapped_as_raw_text() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::Text("not json".into()));

    let response = orch.run(request(), None).await.unwrap();

    assert_eq!(response.status, TaskStatus::CompletedWithParsingError);
    assert_eq!(response.result, Some(json!([{"raw_text": "not json"}])));
    assert_eq!(
        response.error.as_deref(),
        Some("parsing failed, raw text returned")
    );
    assert_eq!(provider.releases(), 1);
}

#[tokio::test]
async fn empty_result_completes_with_explanation() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::Text(String::new()));

    let response = orch.run(request(), None).await.unwrap();

    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.result, None);
    assert_eq!(response.error.as_deref(), Some("no result returned"));
}

#[tokio::test(start_paused = true)]
async fn deadline_expiry_times_out_and_cleans_up() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::WaitsForCancel);
    let mut req = request();
    req.timeout = Some(json!(1));
    req.debug_mode = Some(true);

    let response = orch.run(req, None).await.unwrap();

    assert_eq!(response.status, TaskStatus::Error);
    assert_eq!(response.error.as_deref(), Some("timeout after 1 seconds"));
    assert_eq!(response.result, None);
    assert_eq!(provider.releases(), 1);
    let debug = response.debug_info.expect("debug info");
    assert_eq!(debug.error.as_deref(), Some("timeout after 1 seconds"));
}

#[tokio::test(start_paused = true)]
async fn agent_ignoring_cancellation_is_abandoned() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::IgnoresCancel);
    let mut req = request();
    req.timeout = Some(json!(1));

    let response = orch.run(req, None).await.unwrap();

    assert_eq!(response.status, TaskStatus::Error);
    assert_eq!(provider.releases(), 1);
}

#[tokio::test]
async fn agent_failure_reports_message_and_keeps_chain_in_trace() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::Fails);

    let plain = orch.run(request(), None).await.unwrap();
    assert_eq!(plain.status, TaskStatus::Error);
    assert_eq!(
        plain.error.as_deref(),
        Some("llm request failed: upstream returned 500")
    );
    assert!(plain.debug_info.is_none());

    let mut req = request();
    req.debug_mode = Some(true);
    let debug = orch.run(req, None).await.unwrap();
    let info = debug.debug_info.expect("debug info");
    assert!(info.traceback.is_some());
    assert!(info.logs.iter().any(|e| e.message.starts_with("agent failed")));

    assert_eq!(provider.releases(), 2);
}

#[tokio::test]
async fn panicking_agent_is_a_failure() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::Panics);

    let response = orch.run(request(), None).await.unwrap();

    assert_eq!(response.status, TaskStatus::Error);
    assert!(response.error.unwrap().contains("agent blew up"));
    assert_eq!(provider.releases(), 1);
}

#[tokio::test]
async fn unsupported_agent_output_is_not_stringified() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::ReturnsValue);

    let response = orch.run(request(), None).await.unwrap();

    assert_eq!(response.status, TaskStatus::Error);
    assert!(response
        .error
        .unwrap()
        .contains("unsupported result representation"));
    assert_eq!(response.result, None);
}

#[tokio::test]
async fn missing_credential_fails_before_provisioning() {
    let provider = Arc::new(FakeProvider::default());
    let selector = ModelSelector::new(
        Credentials::from_lookup(|key| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())),
        Settings::default().llm,
    );
    let orch = Orchestrator::new(
        Arc::new(Settings::default()),
        Arc::new(selector),
        provider.clone(),
        Arc::new(FakeAgent::Text("{}".into())),
    );
    let mut req = request();
    req.model = Some("deepseek-chat".into());

    let err = orch.run(req, None).await.unwrap_err();

    assert_eq!(err.http_status(), 500);
    assert!(matches!(
        err,
        TaskError::Config(ConfigError::MissingCredential {
            credential: "DEEPSEEK_API_KEY",
            ..
        })
    ));
    assert!(provider.provisioned().is_empty());
    assert_eq!(provider.releases(), 0);
}

#[tokio::test]
async fn provisioning_failure_is_fatal() {
    let provider = Arc::new(FakeProvider::failing());
    let orch = orchestrator(provider.clone(), FakeAgent::Text("{}".into()));

    let err = orch.run(request(), None).await.unwrap_err();

    assert!(matches!(err, TaskError::Provision(_)));
    assert_eq!(err.http_status(), 500);
    assert_eq!(provider.releases(), 0);
}

#[tokio::test]
async fn invalid_timeout_is_substituted_and_traced() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider, FakeAgent::Text("{}".into()));
    let mut req = request();
    req.timeout = Some(json!(-5));
    req.debug_mode = Some(true);

    let response = orch.run(req, None).await.unwrap();

    let info = response.debug_info.expect("debug info");
    let details = info.task_details.expect("task details");
    assert!(details.deadline_substituted);
    assert_eq!(details.effective_timeout, 300.0);
    assert_eq!(details.timeout, Some(json!(-5)));
    assert!(info
        .logs
        .iter()
        .any(|entry| entry.message == "invalid timeout replaced with default"));
}

#[tokio::test]
async fn missing_timeout_uses_default_and_is_traced() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider, FakeAgent::Text("{}".into()));
    let mut req = request();
    req.debug_mode = Some(true);

    let response = orch.run(req, None).await.unwrap();

    let info = response.debug_info.expect("debug info");
    let details = info.task_details.expect("task details");
    assert!(!details.deadline_substituted);
    assert_eq!(details.effective_timeout, 300.0);
    assert!(info
        .logs
        .iter()
        .any(|entry| entry.message == "no timeout supplied; using default"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_tasks_get_their_own_sandboxes() {
    let provider = Arc::new(FakeProvider::default());
    let orch = orchestrator(provider.clone(), FakeAgent::Text(r#"{"ok": true}"#.into()));

    let (a, b) = tokio::join!(orch.run(request(), None), orch.run(request(), None));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.task_id, b.task_id);
    let provisioned = provider.provisioned();
    assert_eq!(provisioned.len(), 2);
    assert_ne!(provisioned[0].0, provisioned[1].0);
    assert_ne!(provisioned[0].1, provisioned[1].1);
    assert_eq!(provider.releases(), 2);
}

#[tokio::test]
async fn agent_loop_result_flows_through() {
    let provider = Arc::new(FakeProvider::default());
    let done = r#"{"thinking":"read it","next_goal":"report","actions":[{"action":"done","done_success":true,"done_text":"{\"heading\":\"Example Domain\"}"}]}"#;
    let orch = Orchestrator::new(
        Arc::new(Settings::default()),
        Arc::new(ScriptedResolver {
            responses: vec![done.to_string()],
        }),
        provider.clone(),
        Arc::new(LoopAgent::new(AgentLoopConfig::minimal())),
    );

    let response = orch.run(request(), None).await.unwrap();

    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.result, Some(json!({"heading": "Example Domain"})));
    assert_eq!(provider.releases(), 1);
}

#[tokio::test]
async fn guard_release_is_idempotent() {
    let provider = FakeProvider::default();
    let sandbox = provider.provision("task_0000000000000001").await.unwrap();
    let mut guard = SandboxGuard::new(sandbox);

    let first = guard.release().await;
    let second = guard.release().await;

    assert!(first.performed);
    assert!(!second.performed);
    assert!(second.warnings.is_empty());
    assert_eq!(provider.releases(), 1);
}

#[tokio::test]
async fn dropped_guard_still_releases() {
    let provider = FakeProvider::default();
    let sandbox = provider.provision("task_0000000000000002").await.unwrap();
    drop(SandboxGuard::new(sandbox));

    for _ in 0..10 {
        if provider.releases() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(provider.releases(), 1);
}
