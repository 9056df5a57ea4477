//! Mock workflows for testing
//!
//! These let dispatcher, API and client tests script exactly what the
//! workflow reports without any real domain logic.

use super::{Workflow, WorkflowError};
use crate::protocol::{Interrupt, ResolvedReply, TaskHandle, WorkflowOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A call the workflow received
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowCall {
    Start { session_id: String, message: String },
    Resume { task_id: String, reply: ResolvedReply },
}

pub fn suspended(task_id: &str, interrupt: Interrupt) -> WorkflowOutcome {
    WorkflowOutcome::Suspended(TaskHandle::new(task_id, interrupt).unwrap())
}

pub fn completed(result: Value) -> WorkflowOutcome {
    WorkflowOutcome::Completed(result)
}

// ============================================================================
// Scripted Workflow
// ============================================================================

/// Workflow that replays queued steps in order, whatever the input
#[derive(Default)]
pub struct ScriptedWorkflow {
    steps: Mutex<VecDeque<Result<WorkflowOutcome, WorkflowError>>>,
    calls: Mutex<Vec<WorkflowCall>>,
}

impl ScriptedWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, outcome: WorkflowOutcome) -> &Self {
        self.steps.lock().unwrap().push_back(Ok(outcome));
        self
    }

    pub fn queue_error(&self, error: WorkflowError) -> &Self {
        self.steps.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn recorded_calls(&self) -> Vec<WorkflowCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_step(&self, call: WorkflowCall) -> Result<WorkflowOutcome, WorkflowError> {
        self.calls.lock().unwrap().push(call);
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WorkflowError::Interrupted("no scripted step queued".into())))
    }
}

#[async_trait]
impl Workflow for ScriptedWorkflow {
    async fn start(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        self.next_step(WorkflowCall::Start {
            session_id: session_id.to_string(),
            message: message.to_string(),
        })
    }

    async fn resume(
        &self,
        task_id: &str,
        reply: &ResolvedReply,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        self.next_step(WorkflowCall::Resume {
            task_id: task_id.to_string(),
            reply: reply.clone(),
        })
    }
}

// ============================================================================
// Gated Workflow (for in-flight testing)
// ============================================================================

/// Scripted workflow that parks every call until the test releases it
#[derive(Default)]
pub struct GatedWorkflow {
    inner: ScriptedWorkflow,
    /// Notified when a call has entered the workflow
    pub entered: Arc<Notify>,
    /// Notify once to let one parked call finish
    pub release: Arc<Notify>,
}

impl GatedWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, outcome: WorkflowOutcome) -> &Self {
        self.inner.queue(outcome);
        self
    }
}

#[async_trait]
impl Workflow for GatedWorkflow {
    async fn start(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.start(session_id, message).await
    }

    async fn resume(
        &self,
        task_id: &str,
        reply: &ResolvedReply,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.resume(task_id, reply).await
    }
}
