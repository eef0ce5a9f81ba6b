//! Prompt templates for agent loop mode.

use super::types::{AgentHistoryEntry, BrowserStateSummary};

/// System prompt for the observe-think-act loop.
pub const AGENT_LOOP_SYSTEM_PROMPT: &str = r#"You are a browser automation agent. You accomplish the user's task by looking at the current page, deciding on a few actions, and repeating until the task is finished.

## Each Step You Receive
1. The task text.
2. The current URL, title and scroll position.
3. Interactive elements, one per line, prefixed with an index in brackets, e.g.
   [0]<button>Submit</button>
   [1]<input type="text" placeholder="Search">
4. A short log of your previous steps and their results.

Only indices from the current element list are valid; they change whenever the page changes.

## Available Actions
- navigate: {"action": "navigate", "url": "https://example.com"}
- click: {"action": "click", "element_index": 5}
- type_text: {"action": "type_text", "element_index": 3, "text": "query", "submit": true}
- select: {"action": "select", "element_index": 7, "value": "option value"}
- scroll: {"action": "scroll", "direction": "down", "amount": 600}
- go_back: {"action": "go_back"}
- wait: {"action": "wait", "ms": 1000}
- extract_content: {"action": "extract_content"} returns the visible page text in the next step
- done: {"action": "done", "done_success": true, "done_text": "final answer"}

## Response Format
Respond with a single JSON object and nothing else:
{
  "thinking": "what you see and what needs to happen",
  "evaluation_previous_goal": "Success/Failed/Unknown - did the last step work",
  "memory": "facts to carry forward",
  "next_goal": "objective of this step",
  "actions": [{"action": "click", "element_index": 5}]
}

## Rules
- Use at most 3 actions per step. `done` must be the only action of its step.
- Always use navigate for URLs; never type a URL into a search box.
- If an element is missing, scroll or navigate instead of guessing an index.
- Put the complete answer the task asks for into done_text. When the task asks for a specific output format (for example JSON), done_text must be exactly that output with no commentary.
- Call done with done_success false when the task is impossible (login wall, missing page) and explain why in done_text.
"#;

pub fn format_system_prompt() -> String {
    AGENT_LOOP_SYSTEM_PROMPT.to_string()
}

/// Formats the user message containing the task, recent history and browser state.
pub fn format_user_message(
    task: &str,
    state: &BrowserStateSummary,
    history: &[AgentHistoryEntry],
    history_window: usize,
) -> String {
    let mut message = String::new();

    message.push_str("## Task\n");
    message.push_str(task);
    message.push('\n');

    message.push_str(&format!(
        "\n## Step Info\nCurrent step: {}\n",
        history.len() + 1
    ));

    if !history.is_empty() {
        message.push_str("\n## Previous Steps\n");
        let start = history.len().saturating_sub(history_window);
        for entry in &history[start..] {
            message.push_str(&format!("\n### Step {}\n", entry.step_number));
            if let Some(eval) = &entry.evaluation {
                message.push_str(&format!("Evaluation: {eval}\n"));
            }
            if let Some(memory) = &entry.memory {
                message.push_str(&format!("Memory: {memory}\n"));
            }
            message.push_str(&format!("Page: {}\n", entry.state_summary));
            if entry.actions_taken.is_empty() {
                message.push_str("Actions: (none)\n");
            } else {
                message.push_str(&format!("Actions: {}\n", entry.actions_summary()));
            }
            if entry.result.success {
                message.push_str("Result: success\n");
            } else {
                let error = entry
                    .result
                    .error_message
                    .as_deref()
                    .unwrap_or("unknown error");
                message.push_str(&format!("Result: failed - {error}\n"));
            }
        }

        // Only the latest extraction is replayed; older ones are stale.
        if let Some(content) = history
            .last()
            .and_then(|entry| entry.result.extracted_content.as_deref())
        {
            message.push_str("\n## Extracted Content\n");
            message.push_str(content);
            message.push('\n');
        }
    }

    message.push_str("\n## Current Browser State\n");
    message.push_str(&format!("URL: {}\n", state.url));
    if let Some(title) = &state.title {
        message.push_str(&format!("Title: {title}\n"));
    }

    let scroll = &state.scroll_position;
    if scroll.total_height > 0 {
        let viewport = scroll.viewport_height.max(1);
        let below = (scroll.total_height - scroll.pixels_from_top - scroll.viewport_height).max(0);
        message.push_str(&format!(
            "Scroll: {}% | {} page(s) above, {} page(s) below\n",
            scroll.scroll_percentage() as i32,
            scroll.pixels_from_top / viewport,
            below / viewport
        ));
    }

    message.push_str(&format!(
        "\n## Interactive Elements ({} total)\n",
        state.element_count
    ));
    if state.element_tree.is_empty() {
        message.push_str("(no interactive elements)\n");
    } else {
        message.push_str(&state.element_tree);
        message.push('\n');
    }

    message
}
