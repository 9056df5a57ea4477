//! Resume dispatcher
//!
//! Routes start and resume calls for a session to the workflow and keeps the
//! session store in step with what the workflow reported. The store is only
//! written after the workflow has produced an outcome, so a step that dies
//! midway leaves the previous suspension point in place for a retry.

#[cfg(test)]
mod proptests;

use crate::protocol::{
    ErrorCode, Failure, InterruptKind, Reply, ReplyError, TaskHandle, WorkflowOutcome,
};
use crate::session::{SessionLease, SessionSnapshot, SessionStore, StoreError};
use crate::workflow::{Workflow, WorkflowError};
use thiserror::Error;

/// Failure code for a task whose suspended execution no longer exists
pub const TASK_EXPIRED: &str = "task_expired";

/// Why a start, resume or reset was refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("session {session_id} is waiting on task {task_id}; answer or reset it first")]
    SessionBusy { session_id: String, task_id: String },
    #[error("session {0} has no pending task")]
    NoPendingTask(String),
    #[error("reply answers a {received} prompt but a {expected} reply is pending")]
    ReplyKindMismatch {
        expected: InterruptKind,
        received: InterruptKind,
    },
    #[error("invalid reply: {0}")]
    InvalidReply(String),
    #[error("session {0} already has a call in flight")]
    CallInFlight(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("workflow unavailable: {0}")]
    WorkflowUnavailable(String),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::SessionBusy { .. } => ErrorCode::SessionBusy,
            DispatchError::NoPendingTask(_) => ErrorCode::NoPendingTask,
            DispatchError::ReplyKindMismatch { .. } => ErrorCode::ReplyKindMismatch,
            DispatchError::InvalidReply(_) => ErrorCode::InvalidReply,
            DispatchError::CallInFlight(_) => ErrorCode::CallInFlight,
            DispatchError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            DispatchError::WorkflowUnavailable(_) => ErrorCode::WorkflowUnavailable,
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::InFlight(session_id) => DispatchError::CallInFlight(session_id),
        }
    }
}

impl From<ReplyError> for DispatchError {
    fn from(error: ReplyError) -> Self {
        match error {
            ReplyError::KindMismatch { expected, received } => {
                DispatchError::ReplyKindMismatch { expected, received }
            }
            other => DispatchError::InvalidReply(other.to_string()),
        }
    }
}

/// Server-side half of the interrupt/resume protocol
pub struct ResumeDispatcher<W> {
    store: SessionStore,
    workflow: W,
}

impl<W: Workflow> ResumeDispatcher<W> {
    pub fn new(workflow: W) -> Self {
        Self::with_store(SessionStore::new(), workflow)
    }

    pub fn with_store(store: SessionStore, workflow: W) -> Self {
        Self { store, workflow }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Begin a new workflow execution for a session with nothing pending
    pub async fn start(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<WorkflowOutcome, DispatchError> {
        require_session_id(session_id)?;
        if message.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }

        let mut lease = self.store.lease(session_id)?;
        if let Some(pending) = lease.pending() {
            tracing::info!(
                session_id = %session_id,
                task_id = %pending.task_id(),
                "Start refused, task pending"
            );
            return Err(DispatchError::SessionBusy {
                session_id: session_id.to_string(),
                task_id: pending.task_id().to_string(),
            });
        }

        tracing::info!(session_id = %session_id, "Starting workflow");
        let outcome = self
            .workflow
            .start(session_id, message)
            .await
            .map_err(|e| unavailable(session_id, &e))?;

        Ok(settle(&mut lease, outcome))
    }

    /// Answer the pending interrupt of a session
    pub async fn resume(
        &self,
        session_id: &str,
        reply: &Reply,
    ) -> Result<WorkflowOutcome, DispatchError> {
        require_session_id(session_id)?;

        let mut lease = self.store.lease(session_id)?;
        let pending: TaskHandle = lease
            .pending()
            .cloned()
            .ok_or_else(|| DispatchError::NoPendingTask(session_id.to_string()))?;

        let resolved = reply.resolve(pending.interrupt()).map_err(|e| {
            tracing::info!(
                session_id = %session_id,
                task_id = %pending.task_id(),
                kind = %pending.kind(),
                error = %e,
                "Reply refused"
            );
            DispatchError::from(e)
        })?;

        tracing::info!(
            session_id = %session_id,
            task_id = %pending.task_id(),
            kind = %pending.kind(),
            "Resuming workflow"
        );
        match self.workflow.resume(pending.task_id(), &resolved).await {
            Ok(outcome) => Ok(settle(&mut lease, outcome)),
            Err(e) if e.is_retryable() => Err(unavailable(session_id, &e)),
            Err(e) => {
                // Terminal: the suspension point no longer exists
                tracing::warn!(
                    session_id = %session_id,
                    task_id = %pending.task_id(),
                    error = %e,
                    "Workflow no longer knows the pending task"
                );
                lease.clear();
                Ok(WorkflowOutcome::Failed(
                    Failure::new(format!(
                        "task {} has expired; start a new request",
                        pending.task_id()
                    ))
                    .with_code(TASK_EXPIRED),
                ))
            }
        }
    }

    /// Drop the pending task without telling the workflow.
    /// Returns whether there was one.
    pub fn reset(&self, session_id: &str) -> Result<bool, DispatchError> {
        require_session_id(session_id)?;
        let mut lease = self.store.lease(session_id)?;
        let dropped = lease.clear();
        if let Some(handle) = &dropped {
            tracing::info!(
                session_id = %session_id,
                task_id = %handle.task_id(),
                "Session reset"
            );
        }
        Ok(dropped.is_some())
    }

    pub fn status(&self, session_id: &str) -> SessionSnapshot {
        self.store.snapshot(session_id)
    }
}

fn require_session_id(session_id: &str) -> Result<(), DispatchError> {
    if session_id.trim().is_empty() {
        return Err(DispatchError::InvalidRequest(
            "sessionId must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn unavailable(session_id: &str, error: &WorkflowError) -> DispatchError {
    tracing::error!(session_id = %session_id, error = %error, "Workflow step failed");
    DispatchError::WorkflowUnavailable(error.to_string())
}

/// Record what the workflow reported: a suspension overwrites the pending
/// task, anything terminal clears it
fn settle(lease: &mut SessionLease, outcome: WorkflowOutcome) -> WorkflowOutcome {
    match &outcome {
        WorkflowOutcome::Suspended(handle) => {
            lease.replace(handle.clone());
        }
        WorkflowOutcome::Completed(_) | WorkflowOutcome::Failed(_) => {
            lease.clear();
        }
    }
    tracing::info!(
        session_id = %lease.session_id(),
        outcome = outcome.label(),
        task_id = ?outcome.handle().map(TaskHandle::task_id),
        "Workflow step settled"
    );
    outcome
}
