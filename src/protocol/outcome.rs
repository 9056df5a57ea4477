//! Result of one workflow execution step

use super::interrupt::TaskHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure payload reported by a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Exactly one of these holds after every start or resume
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// Paused, waiting for the input described by the handle
    Suspended(TaskHandle),
    /// Finished with free-form result data
    Completed(Value),
    /// Finished unsuccessfully; terminal for the task, not for the session
    Failed(Failure),
}

impl WorkflowOutcome {
    pub fn handle(&self) -> Option<&TaskHandle> {
        match self {
            WorkflowOutcome::Suspended(handle) => Some(handle),
            _ => None,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowOutcome::Suspended(_) => "suspended",
            WorkflowOutcome::Completed(_) => "completed",
            WorkflowOutcome::Failed(_) => "failed",
        }
    }
}
