use std::time::{Duration, Instant};

use agent_core::{AgentError, BrowserStateSummary, PageDriver, ScrollDirection};
use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::SandboxError;

const OBSERVE_SCRIPT: &str = include_str!("scripts/observe.js");
const REF_ATTR: &str = "data-navtask-ref";
const BACK_NAVIGATION_WAIT: Duration = Duration::from_secs(5);

/// Result of waiting for a CSS selector during diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorProbe {
    pub found: bool,
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
struct ObservedPage {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    summary: Option<BrowserStateSummary>,
}

/// [`PageDriver`] over a single Chromium tab.
///
/// Elements are addressed through the `data-navtask-ref` attribute written by
/// the observe script, so indices are only valid until the next observation.
#[derive(Debug, Clone)]
pub struct ChromiumPageDriver {
    page: Page,
    timeout: Duration,
}

impl ChromiumPageDriver {
    pub fn new(page: Page, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T, SandboxError> {
        let result = tokio::time::timeout(
            self.timeout,
            self.page.evaluate_expression(EvaluateParams::new(expression)),
        )
        .await
        .map_err(|_| SandboxError::page("script evaluation timed out"))??;
        result
            .into_value()
            .map_err(|err| SandboxError::page(format!("unexpected script result: {err}")))
    }

    async fn element(&self, index: u32) -> Result<Element, SandboxError> {
        self.page
            .find_element(element_selector(index))
            .await
            .map_err(|_| SandboxError::page(format!("element {index} not found; observe again")))
    }

    /// Navigate and wait for the load to finish; returns the final URL.
    pub async fn goto(&self, url: &str) -> Result<String, SandboxError> {
        tokio::time::timeout(self.timeout, self.page.goto(url))
            .await
            .map_err(|_| SandboxError::page(format!("navigation to {url} timed out")))??;
        Ok(self.current_url().await?.unwrap_or_else(|| url.to_string()))
    }

    pub async fn current_url(&self) -> Result<Option<String>, SandboxError> {
        Ok(self.page.url().await?)
    }

    pub async fn title(&self) -> Result<Option<String>, SandboxError> {
        Ok(self.page.get_title().await?)
    }

    /// `document.readyState` of the current document.
    pub async fn ready_state(&self) -> Result<String, SandboxError> {
        self.eval("document.readyState".to_string()).await
    }

    /// Poll for `selector` until it appears or `wait` elapses.
    pub async fn probe_selector(
        &self,
        selector: &str,
        wait: Duration,
    ) -> Result<SelectorProbe, SandboxError> {
        let selector_json = serde_json::to_string(selector)
            .map_err(|err| SandboxError::page(err.to_string()))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({selector_json}); \
             if (!el) return null; const r = el.getBoundingClientRect(); \
             const s = getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }})()"
        );
        let deadline = Instant::now() + wait;
        loop {
            let visible: Option<bool> = self.eval(script.clone()).await?;
            if let Some(visible) = visible {
                return Ok(SelectorProbe {
                    found: true,
                    visible,
                });
            }
            if Instant::now() >= deadline {
                return Ok(SelectorProbe {
                    found: false,
                    visible: false,
                });
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    pub async fn screenshot_png(&self) -> Result<Vec<u8>, SandboxError> {
        let params = ScreenshotParams::builder().full_page(true).build();
        Ok(self.page.screenshot(params).await?)
    }

    /// First `max_chars` characters of the serialized document.
    pub async fn content_preview(&self, max_chars: usize) -> Result<String, SandboxError> {
        let html = self.page.content().await?;
        Ok(html.chars().take(max_chars).collect())
    }
}

pub(crate) fn element_selector(index: u32) -> String {
    format!("[{REF_ATTR}=\"{index}\"]")
}

fn scroll_delta(direction: ScrollDirection, amount: i32) -> (i32, i32) {
    let amount = amount.saturating_abs();
    match direction {
        ScrollDirection::Up => (0, -amount),
        ScrollDirection::Down => (0, amount),
        ScrollDirection::Left => (-amount, 0),
        ScrollDirection::Right => (amount, 0),
    }
}

fn to_agent(err: SandboxError) -> AgentError {
    AgentError::browser(err.to_string())
}

#[async_trait]
impl PageDriver for ChromiumPageDriver {
    async fn navigate(&self, url: &str) -> Result<(), AgentError> {
        let landed = self.goto(url).await.map_err(to_agent)?;
        debug!(target: "browser-sandbox", requested = %url, landed = %landed, "navigated");
        Ok(())
    }

    async fn observe(
        &self,
        max_elements: u32,
        max_text_length: u32,
    ) -> Result<BrowserStateSummary, AgentError> {
        let observed: ObservedPage = self
            .eval(format!(
                "({})({max_elements}, {max_text_length})",
                OBSERVE_SCRIPT.trim()
            ))
            .await
            .map_err(to_agent)?;
        match observed {
            ObservedPage {
                ok: true,
                summary: Some(summary),
                ..
            } => Ok(summary),
            ObservedPage { error, .. } => Err(AgentError::browser(format!(
                "observation failed: {}",
                error.unwrap_or_else(|| "unknown error".to_string())
            ))),
        }
    }

    async fn click(&self, element_index: u32) -> Result<(), AgentError> {
        let element = self.element(element_index).await.map_err(to_agent)?;
        element
            .click()
            .await
            .map_err(|err| AgentError::browser(format!("click on {element_index} failed: {err}")))?;
        Ok(())
    }

    async fn type_text(
        &self,
        element_index: u32,
        text: &str,
        submit: bool,
    ) -> Result<(), AgentError> {
        let element = self.element(element_index).await.map_err(to_agent)?;
        element.click().await.map_err(|err| AgentError::browser(err.to_string()))?;
        let clear = format!(
            "(() => {{ const el = document.querySelector('{}'); if (el && 'value' in el) {{ el.value = ''; }} return true; }})()",
            element_selector(element_index)
        );
        let _: bool = self.eval(clear).await.map_err(to_agent)?;
        element
            .type_str(text)
            .await
            .map_err(|err| AgentError::browser(err.to_string()))?;
        if submit {
            element
                .press_key("Enter")
                .await
                .map_err(|err| AgentError::browser(err.to_string()))?;
        }
        Ok(())
    }

    async fn select_option(&self, element_index: u32, value: &str) -> Result<(), AgentError> {
        let args = json!({ "selector": element_selector(element_index), "value": value });
        let script = format!(
            "(({{selector, value}}) => {{ const el = document.querySelector(selector); \
             if (!el || !el.options) return false; \
             const opt = Array.from(el.options).find(o => o.value === value || o.text.trim() === value); \
             if (!opt) return false; el.value = opt.value; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})({args})"
        );
        let selected: bool = self.eval(script).await.map_err(to_agent)?;
        if selected {
            Ok(())
        } else {
            Err(AgentError::browser(format!(
                "option {value:?} not found in element {element_index}"
            )))
        }
    }

    async fn scroll(&self, direction: ScrollDirection, amount: i32) -> Result<(), AgentError> {
        let (dx, dy) = scroll_delta(direction, amount);
        let _: bool = self
            .eval(format!("(() => {{ window.scrollBy({dx}, {dy}); return true; }})()"))
            .await
            .map_err(to_agent)?;
        Ok(())
    }

    async fn go_back(&self) -> Result<(), AgentError> {
        let _: bool = self
            .eval("(() => { history.back(); return true; })()".to_string())
            .await
            .map_err(to_agent)?;
        // Same-document and bfcache restores may never report a navigation.
        let _ = tokio::time::timeout(
            BACK_NAVIGATION_WAIT.min(self.timeout),
            self.page.wait_for_navigation(),
        )
        .await;
        Ok(())
    }

    async fn extract_text(&self, max_chars: usize) -> Result<String, AgentError> {
        let text: String = self
            .eval("document.body ? document.body.innerText : ''".to_string())
            .await
            .map_err(to_agent)?;
        Ok(text.chars().take(max_chars).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_target_reference_attribute() {
        assert_eq!(element_selector(7), "[data-navtask-ref=\"7\"]");
    }

    #[test]
    fn scroll_directions_map_to_axes() {
        assert_eq!(scroll_delta(ScrollDirection::Down, 300), (0, 300));
        assert_eq!(scroll_delta(ScrollDirection::Up, 300), (0, -300));
        assert_eq!(scroll_delta(ScrollDirection::Left, -50), (-50, 0));
        assert_eq!(scroll_delta(ScrollDirection::Right, 50), (50, 0));
        assert_eq!(scroll_delta(ScrollDirection::Up, i32::MIN), (0, -i32::MAX));
    }

    #[test]
    fn observed_page_parses_into_summary() {
        let raw = json!({
            "ok": true,
            "url": "https://example.com/",
            "title": "Example Domain",
            "element_tree": "[0]<a href=\"https://www.iana.org/domains/example\">More information...</a>",
            "element_count": 1,
            "scroll_position": {"pixels_from_top": 0, "total_height": 600, "viewport_height": 900}
        });
        let observed: ObservedPage = serde_json::from_value(raw).unwrap();
        let summary = observed.summary.expect("summary");
        assert_eq!(summary.element_count, 1);
        assert_eq!(summary.title.as_deref(), Some("Example Domain"));
        assert!(summary.scroll_position.is_at_bottom());
    }

    #[test]
    fn observe_script_is_a_function_expression() {
        let script = OBSERVE_SCRIPT.trim();
        assert!(script.starts_with("(maxElements, maxText) =>"));
        assert!(script.contains(REF_ATTR));
    }
}
