use agent_core::json::strip_code_fence;
use serde_json::{json, Map, Value};

use super::deadline::ExecutionOutcome;
use crate::task::TaskStatus;

pub const NO_RESULT: &str = "no result returned";
pub const PARSING_FAILED: &str = "parsing failed, raw text returned";

/// Shape of a task result.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    /// Unparseable text kept verbatim.
    RawText(String),
    Empty,
}

impl NormalizedResult {
    /// Wire form: `RawText` becomes `[{"raw_text": ...}]`, `Empty` is omitted.
    pub fn into_value(self) -> Option<Value> {
        match self {
            NormalizedResult::Object(map) => Some(Value::Object(map)),
            NormalizedResult::Array(items) => Some(Value::Array(items)),
            NormalizedResult::RawText(text) => Some(json!([{ "raw_text": text }])),
            NormalizedResult::Empty => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub result: NormalizedResult,
    pub status: TaskStatus,
    pub error: Option<String>,
}

/// Classify an outcome into result, status and error message.
pub fn normalize(outcome: &ExecutionOutcome) -> Normalized {
    match outcome {
        ExecutionOutcome::Completed(text) => normalize_text(text),
        ExecutionOutcome::TimedOut(deadline) => Normalized {
            result: NormalizedResult::Empty,
            status: TaskStatus::Error,
            error: Some(format!("timeout after {} seconds", format_secs(deadline.as_secs_f64()))),
        },
        ExecutionOutcome::Failed(failure) => Normalized {
            result: NormalizedResult::Empty,
            status: TaskStatus::Error,
            error: Some(failure.message.clone()),
        },
    }
}

fn normalize_text(text: &str) -> Normalized {
    if text.trim().is_empty() {
        return Normalized {
            result: NormalizedResult::Empty,
            status: TaskStatus::Completed,
            error: Some(NO_RESULT.to_string()),
        };
    }
    match serde_json::from_str::<Value>(strip_code_fence(text)) {
        Ok(Value::Object(map)) => Normalized {
            result: NormalizedResult::Object(map),
            status: TaskStatus::Completed,
            error: None,
        },
        Ok(Value::Array(items)) => Normalized {
            result: NormalizedResult::Array(items),
            status: TaskStatus::Completed,
            error: None,
        },
        _ => Normalized {
            result: NormalizedResult::RawText(text.to_string()),
            status: TaskStatus::CompletedWithParsingError,
            error: Some(PARSING_FAILED.to_string()),
        },
    }
}

fn format_secs(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{secs}")
    }
}
