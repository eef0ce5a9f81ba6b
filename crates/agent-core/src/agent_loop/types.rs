//! Core data types for the agent loop execution mode.

use serde::{Deserialize, Serialize};

/// Browser state snapshot formatted for LLM consumption.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserStateSummary {
    /// Current page URL.
    pub url: String,

    /// Page title (from document.title).
    #[serde(default)]
    pub title: Option<String>,

    /// Indexed interactive elements, one per line.
    /// Example: "[0]<button>Submit</button>\n[1]<input type=\"text\">"
    #[serde(default)]
    pub element_tree: String,

    /// Current scroll position information.
    #[serde(default)]
    pub scroll_position: ScrollPosition,

    /// Number of indexed elements.
    #[serde(default)]
    pub element_count: u32,
}

impl BrowserStateSummary {
    pub fn headline(&self) -> String {
        match self.title.as_deref().filter(|title| !title.is_empty()) {
            Some(title) => format!("{} ({})", self.url, title),
            None => self.url.clone(),
        }
    }
}

/// Scroll position information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    /// Pixels scrolled from top.
    pub pixels_from_top: i32,
    /// Total scrollable height.
    pub total_height: i32,
    /// Viewport height.
    pub viewport_height: i32,
}

impl ScrollPosition {
    /// Calculate scroll percentage.
    pub fn scroll_percentage(&self) -> f32 {
        if self.total_height <= self.viewport_height {
            100.0
        } else {
            let scrollable = self.total_height - self.viewport_height;
            (self.pixels_from_top as f32 / scrollable as f32 * 100.0).min(100.0)
        }
    }

    /// Check if at bottom of page.
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_percentage() >= 95.0
    }
}

/// LLM output for a single agent loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Chain-of-thought reasoning about current state.
    #[serde(default)]
    pub thinking: String,

    /// Evaluation of whether the previous action achieved its goal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_previous_goal: Option<String>,

    /// Important facts to remember for future steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    /// Immediate next objective.
    #[serde(default)]
    pub next_goal: String,

    /// Actions to execute (typically 1-3).
    #[serde(default)]
    pub actions: Vec<AgentAction>,
}

impl AgentOutput {
    /// Check if output contains a done action.
    pub fn is_done(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a.action_type, AgentActionType::Done))
    }
}

/// Single action in agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    #[serde(rename = "action")]
    pub action_type: AgentActionType,

    /// Element index for element-targeting actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_index: Option<u32>,

    #[serde(flatten)]
    pub params: AgentActionParams,
}

impl AgentAction {
    pub fn done(success: bool, text: impl Into<String>) -> Self {
        Self {
            action_type: AgentActionType::Done,
            element_index: None,
            params: AgentActionParams {
                done_success: Some(success),
                done_text: Some(text.into()),
                ..Default::default()
            },
        }
    }

    /// Short human readable form used in history replay.
    pub fn describe(&self) -> String {
        let name = self.action_type.as_str();
        if let Some(idx) = self.element_index {
            format!("{name}[{idx}]")
        } else if let Some(url) = &self.params.url {
            format!("{name}({})", truncate_string(url, 60))
        } else if let Some(ms) = self.params.ms {
            format!("{name}({ms}ms)")
        } else {
            name.to_string()
        }
    }
}

/// Supported action types in agent loop mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentActionType {
    Navigate,
    Click,
    TypeText,
    Select,
    Scroll,
    Wait,
    GoBack,
    ExtractContent,
    Done,
}

impl AgentActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::TypeText => "type_text",
            Self::Select => "select",
            Self::Scroll => "scroll",
            Self::Wait => "wait",
            Self::GoBack => "go_back",
            Self::ExtractContent => "extract_content",
            Self::Done => "done",
        }
    }
}

/// Action parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Press Enter after typing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<ScrollDirection>,

    /// Scroll amount in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i32>,

    /// Wait duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_text: Option<String>,

    /// Alternative spelling of `done_success` some models emit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// Scroll direction for scroll actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    #[serde(alias = "Up")]
    Up,
    #[serde(alias = "Down")]
    Down,
    #[serde(alias = "Left")]
    Left,
    #[serde(alias = "Right")]
    Right,
}

/// Entry in agent loop history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHistoryEntry {
    /// Step number (1-indexed).
    pub step_number: u32,

    /// Brief summary of browser state at this step.
    pub state_summary: String,

    pub actions_taken: Vec<AgentAction>,

    pub result: AgentActionResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_goal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl AgentHistoryEntry {
    /// Create a new history entry with full LLM output context.
    pub fn from_output(
        step_number: u32,
        state_summary: String,
        output: &AgentOutput,
        result: AgentActionResult,
    ) -> Self {
        Self {
            step_number,
            state_summary,
            actions_taken: output.actions.clone(),
            result,
            thinking: Some(output.thinking.clone()),
            next_goal: Some(output.next_goal.clone()),
            evaluation: output.evaluation_previous_goal.clone(),
            memory: output.memory.clone(),
        }
    }

    /// Create an error entry.
    pub fn error(step_number: u32, error: String) -> Self {
        Self {
            step_number,
            state_summary: "Error occurred".to_string(),
            actions_taken: Vec::new(),
            result: AgentActionResult::failure(error),
            thinking: None,
            next_goal: None,
            evaluation: None,
            memory: None,
        }
    }

    pub fn actions_summary(&self) -> String {
        self.actions_taken
            .iter()
            .map(AgentAction::describe)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of action execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentActionResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Whether the page state changed after actions.
    pub state_changed: bool,

    /// Page text captured by `extract_content`, replayed to the model next step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_content: Option<String>,
}

impl AgentActionResult {
    pub fn ok(state_changed: bool) -> Self {
        Self {
            success: true,
            state_changed,
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Aggregate multiple action results into one.
pub fn aggregate_action_results(results: &[AgentActionResult]) -> AgentActionResult {
    let extracted: Vec<&str> = results
        .iter()
        .filter_map(|r| r.extracted_content.as_deref())
        .collect();
    AgentActionResult {
        success: results.iter().all(|r| r.success),
        error_message: results.iter().find_map(|r| r.error_message.clone()),
        state_changed: results.iter().any(|r| r.state_changed),
        extracted_content: (!extracted.is_empty()).then(|| extracted.join("\n---\n")),
    }
}

pub(crate) fn truncate_string(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
