//! Per-task diagnostic trail.
//!
//! A [`TaskTrace`] is owned by the task execution and passed down explicitly.
//! Every entry is mirrored to `tracing` under the `navtask::diag` target so
//! operators see it in the diagnostic log; the collected entries are returned
//! to the caller only when the task asked for debug output.

use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::TaskSpec;

pub const DIAG_TARGET: &str = "navtask::diag";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: String,
    pub level: TraceLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetails {
    pub url: String,
    pub model: String,
    /// Timeout as requested, `null` when omitted.
    pub timeout: Option<Value>,
    pub effective_timeout: f64,
    pub additional_load_wait_time: i64,
    pub deadline_substituted: bool,
}

/// Debug payload attached to a response when `debug_mode` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugInfo {
    pub start_time: String,
    pub end_time: String,
    /// Seconds.
    pub execution_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_details: Option<TaskDetails>,
    pub logs: Vec<TraceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

#[derive(Debug)]
pub struct TaskTrace {
    task_id: String,
    started_at: DateTime<Utc>,
    started: Instant,
    entries: Vec<TraceEntry>,
    error: Option<String>,
    traceback: Option<String>,
}

impl TaskTrace {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            started_at: Utc::now(),
            started: Instant::now(),
            entries: Vec::new(),
            error: None,
            traceback: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn record(&mut self, level: TraceLevel, message: impl Into<String>, data: Option<Value>) {
        let message = message.into();
        let task_id = self.task_id.as_str();
        let payload = data.as_ref().map(Value::to_string).unwrap_or_default();
        match level {
            TraceLevel::Debug => {
                tracing::debug!(target: DIAG_TARGET, task_id, data = %payload, "{message}")
            }
            TraceLevel::Info => {
                tracing::info!(target: DIAG_TARGET, task_id, data = %payload, "{message}")
            }
            TraceLevel::Warning => {
                tracing::warn!(target: DIAG_TARGET, task_id, data = %payload, "{message}")
            }
            TraceLevel::Error => {
                tracing::error!(target: DIAG_TARGET, task_id, data = %payload, "{message}")
            }
        }
        self.entries.push(TraceEntry {
            timestamp: now_rfc3339(),
            level,
            message,
            data,
        });
    }

    pub fn info(&mut self, message: impl Into<String>, data: Option<Value>) {
        self.record(TraceLevel::Info, message, data);
    }

    pub fn warn(&mut self, message: impl Into<String>, data: Option<Value>) {
        self.record(TraceLevel::Warning, message, data);
    }

    pub fn error(&mut self, message: impl Into<String>, data: Option<Value>) {
        self.record(TraceLevel::Error, message, data);
    }

    /// Remember the failure reported for this task and its full cause chain.
    pub fn set_failure(&mut self, error: impl Into<String>, traceback: Option<String>) {
        self.error = Some(error.into());
        self.traceback = traceback;
    }

    /// Close the trail and build the debug payload.
    pub fn finish(self, spec: Option<&TaskSpec>) -> DebugInfo {
        DebugInfo {
            start_time: self
                .started_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            end_time: now_rfc3339(),
            execution_time: self.started.elapsed().as_secs_f64(),
            task_details: spec.map(|spec| TaskDetails {
                url: spec.url.clone(),
                model: spec.model.clone(),
                timeout: spec.requested_timeout.clone(),
                effective_timeout: spec.deadline.as_secs_f64(),
                additional_load_wait_time: spec.load_wait_secs,
                deadline_substituted: spec.deadline_substituted,
            }),
            logs: self.entries,
            error: self.error,
            traceback: self.traceback,
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entries_keep_order_and_payload() {
        let mut trace = TaskTrace::new("task_1");
        trace.info("sandbox provisioned", Some(json!({"id": "navtask-task_1-x"})));
        trace.warn("deadline substituted", None);
        trace.set_failure("boom", Some("boom\ncaused by: io".into()));

        let info = trace.finish(None);
        assert_eq!(info.logs.len(), 2);
        assert_eq!(info.logs[0].level, TraceLevel::Info);
        assert_eq!(info.logs[0].data, Some(json!({"id": "navtask-task_1-x"})));
        assert_eq!(info.logs[1].message, "deadline substituted");
        assert_eq!(info.error.as_deref(), Some("boom"));
        assert!(info.execution_time >= 0.0);
    }

    #[test]
    fn levels_serialize_upper_case() {
        let value = serde_json::to_value(TraceLevel::Warning).unwrap();
        assert_eq!(value, json!("WARNING"));
    }
}
