//! Agent Loop (Observe-Think-Act) execution mode.
//!
//! The LLM is consulted at each step to decide the next action based on the
//! current browser state, rather than generating a complete plan upfront.
//!
//! # Architecture
//!
//! ```text
//! while !done && steps < max:
//!     state = observe()      // Get current browser state
//!     action = llm.decide()  // LLM decides based on state
//!     result = execute()     // Execute 1-3 actions
//!     if action.is_done: break
//! ```

pub mod config;
pub mod controller;
pub mod prompt;
pub mod types;

pub use config::AgentLoopConfig;
pub use controller::{AgentLoopController, LoopAgent};
pub use prompt::{format_system_prompt, format_user_message};
pub use types::{
    AgentAction, AgentActionParams, AgentActionResult, AgentActionType, AgentHistoryEntry,
    AgentOutput, BrowserStateSummary, ScrollDirection, ScrollPosition,
};
