use std::error::Error as StdError;
use std::time::Duration;

use agent_core::{AgentError, AgentRunOutput};
use serde_json::Value;
use tokio::task::JoinError;
use tracing::{debug, warn};

use super::dispatcher::AgentHandle;

/// How the agent operation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed(String),
    TimedOut(Duration),
    Failed(AgentFailure),
}

/// Agent failure with its cause chain, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFailure {
    pub message: String,
    pub chain: Vec<String>,
}

impl AgentFailure {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            chain: vec![message.clone()],
            message,
        }
    }

    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut chain = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: err.to_string(),
            chain,
        }
    }

    pub fn traceback(&self) -> String {
        self.chain.join("\ncaused by: ")
    }
}

/// Deadline actually applied to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineChoice {
    pub deadline: Duration,
    /// A value was supplied but was not a positive number of seconds.
    pub substituted: bool,
}

/// Positive seconds are used as given; anything else, including values that
/// round down to a zero duration, falls back to `default`.
pub fn resolve_deadline(requested: Option<&Value>, default: Duration) -> DeadlineChoice {
    let seconds = match requested {
        None | Some(Value::Null) => {
            return DeadlineChoice {
                deadline: default,
                substituted: false,
            }
        }
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match seconds
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .filter(|deadline| !deadline.is_zero())
    {
        Some(deadline) => DeadlineChoice {
            deadline,
            substituted: false,
        },
        None => DeadlineChoice {
            deadline: default,
            substituted: true,
        },
    }
}

/// Race the agent against `deadline`.
///
/// On expiry the operation is cancelled and given `grace` to stop; after
/// that it is aborted and its eventual result discarded.
pub async fn govern(handle: AgentHandle, deadline: Duration, grace: Duration) -> ExecutionOutcome {
    let AgentHandle { mut join, cancel } = handle;
    match tokio::time::timeout(deadline, &mut join).await {
        Ok(joined) => outcome_from_join(joined),
        Err(_) => {
            cancel.cancel();
            match tokio::time::timeout(grace, &mut join).await {
                Ok(_) => debug!(target: "navtask::task", "agent stopped after cancellation"),
                Err(_) => {
                    join.abort();
                    warn!(
                        target: "navtask::task",
                        grace_ms = grace.as_millis() as u64,
                        "agent ignored cancellation; abandoned"
                    );
                }
            }
            ExecutionOutcome::TimedOut(deadline)
        }
    }
}

fn outcome_from_join(
    joined: Result<Result<AgentRunOutput, AgentError>, JoinError>,
) -> ExecutionOutcome {
    match joined {
        Ok(Ok(AgentRunOutput::History(history))) => {
            debug!(
                target: "navtask::task",
                steps = history.steps_taken(),
                success = history.is_successful(),
                finished = history.is_done(),
                "agent history returned"
            );
            ExecutionOutcome::Completed(history.final_result().unwrap_or_default().to_string())
        }
        Ok(Ok(AgentRunOutput::Text(text))) => ExecutionOutcome::Completed(text),
        Ok(Ok(other)) => ExecutionOutcome::Failed(AgentFailure::new(format!(
            "agent returned an unsupported result representation ({})",
            other.kind()
        ))),
        Ok(Err(err)) => ExecutionOutcome::Failed(AgentFailure::from_error(&err)),
        Err(err) if err.is_panic() => {
            let payload = err.into_panic();
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            ExecutionOutcome::Failed(AgentFailure::new(format!("agent panicked: {detail}")))
        }
        Err(err) => ExecutionOutcome::Failed(AgentFailure::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const DEFAULT: Duration = Duration::from_secs(300);

    #[test]
    fn positive_values_are_used() {
        let choice = resolve_deadline(Some(&json!(30)), DEFAULT);
        assert_eq!(choice.deadline, Duration::from_secs(30));
        assert!(!choice.substituted);

        let choice = resolve_deadline(Some(&json!("1.5")), DEFAULT);
        assert_eq!(choice.deadline, Duration::from_millis(1500));
    }

    #[test]
    fn missing_value_uses_default_without_substitution() {
        assert_eq!(
            resolve_deadline(None, DEFAULT),
            DeadlineChoice {
                deadline: DEFAULT,
                substituted: false
            }
        );
        assert!(!resolve_deadline(Some(&Value::Null), DEFAULT).substituted);
    }

    #[test]
    fn invalid_values_are_substituted() {
        for value in [json!(0), json!(-1), json!("soon"), json!([5]), json!(true), json!(1e300), json!(1e-12)] {
            let choice = resolve_deadline(Some(&value), DEFAULT);
            assert_eq!(choice.deadline, DEFAULT, "{value}");
            assert!(choice.substituted, "{value}");
        }
    }

    #[test]
    fn failure_chain_follows_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = anyhow::Error::new(io).context("llm request failed");
        let failure = AgentFailure::from_error(&*err);
        assert_eq!(failure.message, "llm request failed");
        assert_eq!(failure.traceback(), "llm request failed\ncaused by: socket closed");
    }
}
