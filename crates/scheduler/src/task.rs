use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SchedulerError;
use crate::timer::TaskTimer;

/// Result of one job invocation.
///
/// Invocations never return errors to the scheduler; failures are values the
/// scheduler logs before computing the next trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded { detail: String },
    Skipped { reason: String },
    Failed { error: String },
}

impl TaskOutcome {
    pub fn succeeded(detail: impl Into<String>) -> Self {
        TaskOutcome::Succeeded { detail: detail.into() }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        TaskOutcome::Skipped { reason: reason.into() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        TaskOutcome::Failed { error: error.into() }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Succeeded { .. } => "succeeded",
            TaskOutcome::Skipped { .. } => "skipped",
            TaskOutcome::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Succeeded { detail } => write!(f, "succeeded: {detail}"),
            TaskOutcome::Skipped { reason } => write!(f, "skipped: {reason}"),
            TaskOutcome::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// A named unit of periodic work.
///
/// Implementations must tolerate being invoked repeatedly; the scheduler
/// guarantees only that two invocations of the same job never overlap.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Unique job name, used as the registry key and in logs.
    fn name(&self) -> &str;

    /// Run one cycle.
    async fn execute(&self) -> TaskOutcome;

    /// Timer used when the job is registered without an explicit one.
    fn timer(&self) -> Result<Box<dyn TaskTimer>, SchedulerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels() {
        assert_eq!(TaskOutcome::succeeded("ok").label(), "succeeded");
        assert_eq!(TaskOutcome::skipped("not leader").label(), "skipped");
        assert!(TaskOutcome::failed("boom").is_failure());
        assert!(!TaskOutcome::skipped("x").is_failure());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(TaskOutcome::skipped("not leader")).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "not leader");
    }
}
