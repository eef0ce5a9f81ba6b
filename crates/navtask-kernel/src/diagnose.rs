//! One-shot browser diagnosis: can a sandboxed browser reach a URL, and what
//! does it see there?

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use browser_sandbox::{ChromiumPageDriver, SandboxError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::sandbox::ChromeSandboxProvider;
use crate::settings::Settings;
use crate::trace::{TaskTrace, TraceEntry};

const SELECTOR_WAIT: Duration = Duration::from_secs(5);
const PREVIEW_CHARS: usize = 500;

fn default_wait_time() -> i64 {
    5
}

fn default_capture() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRequest {
    pub url: String,
    #[serde(default)]
    pub selector: Option<String>,
    /// Seconds to wait after load before inspecting the page.
    #[serde(default = "default_wait_time")]
    pub wait_time: i64,
    #[serde(default = "default_capture")]
    pub capture_screenshot: bool,
}

impl DiagnosticRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selector: None,
            wait_time: default_wait_time(),
            capture_screenshot: default_capture(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorReport {
    pub selector: String,
    pub found: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub diag_id: String,
    pub url: String,
    pub final_url: Option<String>,
    pub title: Option<String>,
    /// `document.readyState` after navigation.
    pub ready_state: Option<String>,
    pub selector: Option<SelectorReport>,
    pub screenshot: Option<String>,
    pub content_preview: Option<String>,
    pub execution_time: f64,
    pub logs: Vec<TraceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticResponse {
    pub status: DiagnosticStatus,
    pub message: String,
    pub timestamp: String,
    pub debug_info: DiagnosticReport,
}

#[derive(Debug, Clone)]
pub struct BrowserDiagnostics {
    provider: ChromeSandboxProvider,
    screenshot_dir: PathBuf,
}

impl BrowserDiagnostics {
    pub fn new(provider: ChromeSandboxProvider, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ChromeSandboxProvider::new(settings.sandbox.clone()),
            settings.log_dir.clone(),
        )
    }

    /// Never fails; problems are reported through the response status.
    pub async fn diagnose(&self, request: DiagnosticRequest) -> DiagnosticResponse {
        let started = Instant::now();
        let diag_id = format!("diag_{}", &Uuid::new_v4().simple().to_string()[..16]);
        let mut trace = TaskTrace::new(&diag_id);
        let mut report = DiagnosticReport {
            diag_id: diag_id.clone(),
            url: request.url.clone(),
            ..Default::default()
        };
        trace.info(
            format!("diagnosis started for {}", request.url),
            Some(json!({
                "selector": request.selector,
                "wait_time": request.wait_time,
                "capture_screenshot": request.capture_screenshot,
            })),
        );

        let result = if request.url.trim().is_empty() {
            Err("url must not be empty".to_string())
        } else {
            match self.provider.launch(&diag_id).await {
                Ok(sandbox) => {
                    let driver = sandbox.driver();
                    let probed = self
                        .inspect(&driver, &request, &mut report, &mut trace)
                        .await
                        .map_err(|err| err.to_string());
                    let released = sandbox.release().await;
                    for warning in released.warnings {
                        trace.warn(format!("cleanup warning: {warning}"), None);
                    }
                    trace.info("browser closed", None);
                    probed
                }
                Err(err) => Err(format!("failed to launch browser: {}", err.message)),
            }
        };

        let (status, message) = match result {
            Ok(()) => (
                DiagnosticStatus::Success,
                format!("browser reached {}", report.final_url.as_deref().unwrap_or(&request.url)),
            ),
            Err(err) => {
                trace.error(format!("diagnosis failed: {err}"), None);
                report.error = Some(err.clone());
                (DiagnosticStatus::Error, format!("diagnosis failed: {err}"))
            }
        };
        info!(target: "navtask::task", diag_id = %diag_id, ?status, "diagnosis finished");

        report.execution_time = started.elapsed().as_secs_f64();
        report.logs = trace.finish(None).logs;
        DiagnosticResponse {
            status,
            message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            debug_info: report,
        }
    }

    async fn inspect(
        &self,
        driver: &ChromiumPageDriver,
        request: &DiagnosticRequest,
        report: &mut DiagnosticReport,
        trace: &mut TaskTrace,
    ) -> Result<(), SandboxError> {
        let final_url = driver.goto(&request.url).await?;
        trace.info("navigation finished", Some(json!({ "final_url": final_url })));
        report.final_url = Some(final_url);
        report.ready_state = Some(driver.ready_state().await?);
        report.title = driver.title().await?;

        if request.wait_time > 0 {
            trace.info(format!("waiting {}s for late content", request.wait_time), None);
            tokio::time::sleep(Duration::from_secs(request.wait_time as u64)).await;
        }

        if let Some(selector) = request.selector.as_deref().filter(|s| !s.trim().is_empty()) {
            let probe = driver.probe_selector(selector, SELECTOR_WAIT).await?;
            trace.info(
                format!("selector {selector}: found={} visible={}", probe.found, probe.visible),
                None,
            );
            report.selector = Some(SelectorReport {
                selector: selector.to_string(),
                found: probe.found,
                visible: probe.visible,
            });
        }

        if request.capture_screenshot {
            let path = screenshot_path(&self.screenshot_dir, &report.diag_id);
            match save_screenshot(driver, &path).await {
                Ok(()) => {
                    trace.info("screenshot saved", Some(json!({ "path": path.display().to_string() })));
                    report.screenshot = Some(path.display().to_string());
                }
                Err(err) => trace.warn(format!("screenshot failed: {err}"), None),
            }
        }

        report.content_preview = Some(driver.content_preview(PREVIEW_CHARS).await?);
        Ok(())
    }
}

pub fn screenshot_path(dir: &Path, diag_id: &str) -> PathBuf {
    dir.join(format!("screenshot_{diag_id}.png"))
}

async fn save_screenshot(driver: &ChromiumPageDriver, path: &Path) -> anyhow::Result<()> {
    let png = driver.screenshot_png().await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, png).await?;
    Ok(())
}
