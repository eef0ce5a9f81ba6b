use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::TaskError;
use crate::orchestrator::deadline::resolve_deadline;
use crate::settings::Settings;
use crate::trace::DebugInfo;

/// Incoming task as accepted on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    pub url: String,
    pub task: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Seconds. Kept loose so invalid values can be replaced instead of rejected.
    #[serde(default)]
    pub timeout: Option<Value>,
    /// Seconds; fractional values are rounded up.
    #[serde(default)]
    pub additional_load_wait_time: Option<f64>,
    #[serde(default)]
    pub debug_mode: Option<bool>,
    /// Accepted and ignored.
    #[serde(default)]
    pub additional_params: Option<Value>,
}

impl TaskRequest {
    pub fn new(url: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            task: task.into(),
            ..Self::default()
        }
    }
}

/// Validated, immutable task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: String,
    pub url: String,
    pub description: String,
    pub model: String,
    pub deadline: Duration,
    /// The caller supplied a deadline that was unusable and the default was used.
    pub deadline_substituted: bool,
    /// Raw timeout value as received, for the debug payload.
    pub requested_timeout: Option<Value>,
    /// Seconds to wait after page load; only shapes the prompt.
    pub load_wait_secs: i64,
    pub debug: bool,
}

impl TaskSpec {
    pub fn from_request(request: &TaskRequest, settings: &Settings) -> Result<Self, TaskError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(TaskError::invalid_request("url must not be empty"));
        }
        let description = request.task.trim();
        if description.is_empty() {
            return Err(TaskError::invalid_request("task must not be empty"));
        }
        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(&settings.defaults.model)
            .to_string();
        let deadline = resolve_deadline(request.timeout.as_ref(), settings.default_timeout());

        Ok(Self {
            id: new_task_id(),
            url: url.to_string(),
            description: request.task.clone(),
            model,
            deadline: deadline.deadline,
            deadline_substituted: deadline.substituted,
            requested_timeout: request.timeout.clone(),
            load_wait_secs: request
                .additional_load_wait_time
                .filter(|secs| secs.is_finite())
                .map(|secs| secs.ceil() as i64)
                .unwrap_or(settings.defaults.load_wait_secs),
            debug: request.debug_mode.unwrap_or(false),
        })
    }
}

/// `task_` followed by 16 lowercase hex characters.
pub fn new_task_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("task_{}", &hex[..16])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    CompletedWithParsingError,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::CompletedWithParsingError => "completed_with_parsing_error",
            TaskStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn task_ids_are_prefixed_hex() {
        let id = new_task_id();
        assert_eq!(id.len(), 21);
        assert!(id.starts_with("task_"));
        assert!(id[5..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_task_id());
    }

    #[test]
    fn request_defaults_apply() {
        let request: TaskRequest =
            serde_json::from_value(json!({"url": "https://example.com", "task": "find x"}))
                .unwrap();
        let spec = TaskSpec::from_request(&request, &Settings::default()).unwrap();
        assert_eq!(spec.model, "gpt-4.1");
        assert_eq!(spec.deadline, Duration::from_secs(300));
        assert!(!spec.deadline_substituted);
        assert_eq!(spec.load_wait_secs, 5);
        assert!(!spec.debug);
    }

    #[test]
    fn nulls_and_fractional_waits_are_accepted() {
        let request: TaskRequest = serde_json::from_value(json!({
            "url": "https://example.com",
            "task": "find x",
            "debug_mode": null,
            "additional_load_wait_time": 2.5,
        }))
        .unwrap();
        let spec = TaskSpec::from_request(&request, &Settings::default()).unwrap();
        assert!(!spec.debug);
        assert_eq!(spec.load_wait_secs, 3);

        let request: TaskRequest = serde_json::from_value(json!({
            "url": "https://example.com",
            "task": "find x",
            "debug_mode": true,
            "additional_load_wait_time": null,
        }))
        .unwrap();
        let spec = TaskSpec::from_request(&request, &Settings::default()).unwrap();
        assert!(spec.debug);
        assert_eq!(spec.load_wait_secs, 5);
    }

    #[test]
    fn non_positive_timeout_is_substituted() {
        let mut request = TaskRequest::new("https://example.com", "x");
        request.timeout = Some(json!(-3));
        let spec = TaskSpec::from_request(&request, &Settings::default()).unwrap();
        assert_eq!(spec.deadline, Duration::from_secs(300));
        assert!(spec.deadline_substituted);
    }

    #[test]
    fn blank_fields_are_rejected() {
        let settings = Settings::default();
        let err = TaskSpec::from_request(&TaskRequest::new(" ", "x"), &settings).unwrap_err();
        assert_eq!(err.http_status(), 422);
        assert!(TaskSpec::from_request(&TaskRequest::new("https://a", ""), &settings).is_err());
    }

    #[test]
    fn response_omits_absent_fields() {
        let response = TaskResponse {
            task_id: "task_0123456789abcdef".into(),
            status: TaskStatus::CompletedWithParsingError,
            result: Some(json!([{"raw_text": "not json"}])),
            error: Some("parsing failed, raw text returned".into()),
            debug_info: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "completed_with_parsing_error");
        assert!(value.get("debug_info").is_none());

        let bare = TaskResponse {
            result: None,
            error: None,
            status: TaskStatus::Completed,
            ..response
        };
        let value = serde_json::to_value(&bare).unwrap();
        assert!(value.get("result").is_none());
        assert!(value.get("error").is_none());
    }
}
