//! Agent core primitives.
//!
//! Defines the seams between the task orchestrator and its collaborators: the
//! language-model client ([`LlmClient`]), the browser surface the agent drives
//! ([`PageDriver`]) and the agent itself ([`BrowserAgent`]). The default agent is
//! an observe-think-act loop living in [`agent_loop`].

pub mod agent;
pub mod agent_loop;
pub mod driver;
pub mod errors;
pub mod json;
pub mod llm_provider;

pub use agent::{AgentHistory, AgentRunOutput, AgentTask, BrowserAgent};
pub use agent_loop::{
    AgentAction, AgentActionParams, AgentActionResult, AgentActionType, AgentHistoryEntry,
    AgentLoopConfig, AgentLoopController, AgentOutput, BrowserStateSummary, LoopAgent,
    ScrollDirection, ScrollPosition,
};
pub use driver::PageDriver;
pub use errors::AgentError;
pub use json::extract_json_object;
pub use llm_provider::{ChatMessage, ChatRole, LlmClient, ScriptedLlmClient};
