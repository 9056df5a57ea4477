//! Workflow seam
//!
//! A workflow is the external collaborator that does the actual work. The
//! gateway only needs it to report one [`WorkflowOutcome`] per step.

mod document;

#[cfg(test)]
pub mod testing;

pub use document::{DocType, DocumentWorkflow, PolicyRules};

use crate::protocol::{ResolvedReply, WorkflowOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// A step that ended without producing an outcome
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The step crashed or could not run; its suspension point is intact
    #[error("workflow step did not complete: {0}")]
    Interrupted(String),
    /// The workflow no longer knows this task (expired or never existed)
    #[error("no suspended execution for task {0}")]
    UnknownTask(String),
}

impl WorkflowError {
    /// Whether resubmitting the same input can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::Interrupted(_))
    }
}

#[async_trait]
pub trait Workflow: Send + Sync {
    /// Begin a new execution for a session
    async fn start(&self, session_id: &str, message: &str)
        -> Result<WorkflowOutcome, WorkflowError>;

    /// Re-enter a suspended execution at its suspension point
    async fn resume(
        &self,
        task_id: &str,
        reply: &ResolvedReply,
    ) -> Result<WorkflowOutcome, WorkflowError>;
}

#[async_trait]
impl<T: Workflow + ?Sized> Workflow for Arc<T> {
    async fn start(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        (**self).start(session_id, message).await
    }

    async fn resume(
        &self,
        task_id: &str,
        reply: &ResolvedReply,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        (**self).resume(task_id, reply).await
    }
}
