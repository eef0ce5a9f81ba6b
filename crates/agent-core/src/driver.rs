use async_trait::async_trait;

use crate::agent_loop::{BrowserStateSummary, ScrollDirection};
use crate::errors::AgentError;

/// Browser surface the agent loop drives.
///
/// Element indices refer to the most recent [`PageDriver::observe`] call; an
/// implementation is free to invalidate them after any navigation.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), AgentError>;

    /// Index interactive elements and summarise the page for the model.
    async fn observe(
        &self,
        max_elements: u32,
        max_text_length: u32,
    ) -> Result<BrowserStateSummary, AgentError>;

    async fn click(&self, element_index: u32) -> Result<(), AgentError>;

    async fn type_text(&self, element_index: u32, text: &str, submit: bool)
        -> Result<(), AgentError>;

    async fn select_option(&self, element_index: u32, value: &str) -> Result<(), AgentError>;

    async fn scroll(&self, direction: ScrollDirection, amount: i32) -> Result<(), AgentError>;

    async fn go_back(&self) -> Result<(), AgentError>;

    /// Visible text of the current document, truncated to `max_chars`.
    async fn extract_text(&self, max_chars: usize) -> Result<String, AgentError>;
}
