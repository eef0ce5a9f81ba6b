//! navtask kernel.
//!
//! Runs natural-language browser tasks: each task gets a disposable Chromium
//! sandbox, an LLM-driven agent runs under a hard deadline, the result is
//! normalized into structured JSON and the sandbox is always torn down.

pub mod diagnose;
pub mod errors;
pub mod llm;
pub mod logs;
pub mod orchestrator;
pub mod sandbox;
pub mod settings;
pub mod task;
pub mod trace;

pub use diagnose::{BrowserDiagnostics, DiagnosticRequest, DiagnosticResponse, DiagnosticStatus};
pub use errors::{ConfigError, ProvisionError, TaskError};
pub use llm::{ModelFamily, ModelResolver, ModelSelector};
pub use orchestrator::{ExecutionOutcome, NormalizedResult, Orchestrator};
pub use sandbox::{ChromeSandboxProvider, SandboxProvider, TaskSandbox};
pub use settings::{Credentials, Settings};
pub use task::{TaskRequest, TaskResponse, TaskSpec, TaskStatus};
pub use trace::{DebugInfo, TaskTrace, TraceLevel};
