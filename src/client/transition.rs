//! Pure state transition function for the client
//!
//! Given the same state and event this always yields the same state and
//! effects; all I/O happens in the controller that executes the effects.

use super::{ClientEvent, ControllerState, Effect, InputAffordance};
use crate::protocol::{ErrorCode, Reply, ReplyError, TaskHandle, WorkflowOutcome};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ControllerState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ControllerState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Input refused before anything is sent
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a request is already in flight; wait for it to finish")]
    Busy,
    #[error("task {task_id} is waiting for a reply; answer it or abandon it first")]
    ReplyPending { task_id: String },
    #[error("{0}")]
    InvalidInput(#[from] ReplyError),
    #[error("nothing to retry")]
    NothingToRetry,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &ControllerState,
    event: ClientEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Input routing
        // ============================================================

        // Idle + input -> Starting
        (
            ControllerState::Idle { .. },
            ClientEvent::UserInput { text: message } | ClientEvent::Start { message },
        ) => begin_start(&message),

        // AwaitingReply + input -> Replying; input always answers the pending task
        (ControllerState::AwaitingReply { pending, .. }, ClientEvent::UserInput { text }) => {
            let reply = Reply::shaped(pending.interrupt(), &text)?;
            Ok(begin_resume(pending, reply))
        }

        (ControllerState::AwaitingReply { pending, .. }, ClientEvent::Start { .. }) => {
            Err(TransitionError::ReplyPending {
                task_id: pending.task_id().to_string(),
            })
        }

        (
            ControllerState::Starting { .. } | ControllerState::Replying { .. },
            ClientEvent::UserInput { .. }
            | ClientEvent::Start { .. }
            | ClientEvent::Retry
            | ClientEvent::Abandon,
        ) => Err(TransitionError::Busy),

        // ============================================================
        // Retry and abandon
        // ============================================================
        (
            ControllerState::Idle {
                retry_message: Some(message),
            },
            ClientEvent::Retry,
        ) => begin_start(message),

        (
            ControllerState::AwaitingReply {
                pending,
                retry_reply: Some(reply),
            },
            ClientEvent::Retry,
        ) => Ok(begin_resume(pending, reply.clone())),

        (
            ControllerState::Idle { .. } | ControllerState::AwaitingReply { .. },
            ClientEvent::Retry,
        ) => Err(TransitionError::NothingToRetry),

        (
            ControllerState::Idle { .. } | ControllerState::AwaitingReply { .. },
            ClientEvent::Abandon,
        ) => Ok(TransitionResult::new(ControllerState::default()).with_effect(Effect::SendReset)),

        // ============================================================
        // Server responses
        // ============================================================
        (
            ControllerState::Starting { .. } | ControllerState::Replying { .. },
            ClientEvent::Response(outcome),
        ) => Ok(settle(outcome)),

        (ControllerState::Starting { message }, ClientEvent::Rejected { code, message: error }) => {
            // Starting never touched local bookkeeping; only a retryable
            // refusal keeps the message around
            let retry_message = is_retryable(code).then(|| message.clone());
            Ok(
                TransitionResult::new(ControllerState::Idle { retry_message })
                    .with_effect(Effect::ShowError {
                        code,
                        message: error,
                    }),
            )
        }

        (
            ControllerState::Replying { pending, reply },
            ClientEvent::Rejected { code, message },
        ) => Ok(reply_rejected(pending, reply, code, message)),

        // Transport failure: clear the waiting flag only
        (ControllerState::Starting { message }, ClientEvent::TransportFailed { .. }) => {
            Ok(TransitionResult::new(ControllerState::Idle {
                retry_message: Some(message.clone()),
            }))
        }

        (ControllerState::Replying { pending, reply }, ClientEvent::TransportFailed { .. }) => {
            Ok(TransitionResult::new(ControllerState::AwaitingReply {
                pending: pending.clone(),
                retry_reply: Some(reply.clone()),
            }))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while {state:?}"
        ))),
    }
}

fn begin_start(message: &str) -> Result<TransitionResult, TransitionError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(TransitionError::EmptyMessage);
    }
    Ok(TransitionResult::new(ControllerState::Starting {
        message: message.to_string(),
    })
    .with_effect(Effect::SendStart {
        message: message.to_string(),
    }))
}

fn begin_resume(pending: &TaskHandle, reply: Reply) -> TransitionResult {
    TransitionResult::new(ControllerState::Replying {
        pending: pending.clone(),
        reply: reply.clone(),
    })
    .with_effect(Effect::SendResume { reply })
}

fn settle(outcome: WorkflowOutcome) -> TransitionResult {
    match outcome {
        WorkflowOutcome::Suspended(handle) => {
            let affordance = InputAffordance::from(handle.interrupt());
            TransitionResult::new(ControllerState::AwaitingReply {
                pending: handle,
                retry_reply: None,
            })
            .with_effect(Effect::ShowPrompt(affordance))
        }
        WorkflowOutcome::Completed(result) => {
            TransitionResult::new(ControllerState::default()).with_effect(Effect::ShowResult(result))
        }
        WorkflowOutcome::Failed(failure) => TransitionResult::new(ControllerState::default())
            .with_effect(Effect::ShowFailure(failure)),
    }
}

fn reply_rejected(
    pending: &TaskHandle,
    reply: &Reply,
    code: ErrorCode,
    message: String,
) -> TransitionResult {
    let error = Effect::ShowError { code, message };
    match code {
        // Server has nothing pending; the local record is stale
        ErrorCode::NoPendingTask => TransitionResult::new(ControllerState::default()).with_effect(error),
        code if is_retryable(code) => TransitionResult::new(ControllerState::AwaitingReply {
            pending: pending.clone(),
            retry_reply: Some(reply.clone()),
        })
        .with_effect(error),
        _ => TransitionResult::new(ControllerState::AwaitingReply {
            pending: pending.clone(),
            retry_reply: None,
        })
        .with_effect(error)
        .with_effect(Effect::ShowPrompt(InputAffordance::from(pending.interrupt()))),
    }
}

/// Refusals where resending the same request can succeed
fn is_retryable(code: ErrorCode) -> bool {
    matches!(code, ErrorCode::WorkflowUnavailable | ErrorCode::CallInFlight)
}
