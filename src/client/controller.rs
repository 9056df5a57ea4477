//! Client interaction controller
//!
//! Owns the per-session client state, feeds events through [`transition`],
//! and executes the request effects against a [`Transport`]. Everything the
//! user should see comes back in [`Update::output`].

use super::transition::{transition, TransitionError};
use super::transport::{Transport, TransportError};
use super::{ClientEvent, ControllerState, Effect};
use crate::protocol::{ResumeRequest, StartRequest, TaskHandle, WorkflowOutcome};
use dashmap::DashMap;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Refused locally; nothing was sent
    #[error(transparent)]
    Usage(#[from] TransitionError),
    /// Request went out but no usable answer came back. Local bookkeeping
    /// is unchanged apart from the waiting flag, and `retry` resends it.
    #[error("{0}")]
    Transport(String),
}

/// What one user action produced
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub state: ControllerState,
    /// User-facing effects, in order
    pub output: Vec<Effect>,
}

pub struct InteractionController<T> {
    transport: T,
    sessions: DashMap<String, ControllerState>,
}

impl<T: Transport> InteractionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            sessions: DashMap::new(),
        }
    }

    /// Current state of a session; unknown sessions are idle
    pub fn state(&self, session_id: &str) -> ControllerState {
        self.sessions
            .get(session_id)
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    pub fn pending(&self, session_id: &str) -> Option<TaskHandle> {
        self.state(session_id).pending().cloned()
    }

    /// Route a line of user input: a new task when idle, a reply otherwise
    pub async fn submit(&self, session_id: &str, text: &str) -> Result<Update, ClientError> {
        self.dispatch(
            session_id,
            ClientEvent::UserInput {
                text: text.to_string(),
            },
        )
        .await
    }

    /// Begin a new task; refused while a reply is pending
    pub async fn start(&self, session_id: &str, message: &str) -> Result<Update, ClientError> {
        self.dispatch(
            session_id,
            ClientEvent::Start {
                message: message.to_string(),
            },
        )
        .await
    }

    /// Resend the last request that got no usable answer
    pub async fn retry(&self, session_id: &str) -> Result<Update, ClientError> {
        self.dispatch(session_id, ClientEvent::Retry).await
    }

    /// Drop the pending task here and on the server
    pub async fn abandon(&self, session_id: &str) -> Result<Update, ClientError> {
        self.dispatch(session_id, ClientEvent::Abandon).await
    }

    async fn dispatch(&self, session_id: &str, event: ClientEvent) -> Result<Update, ClientError> {
        let mut output = Vec::new();
        let mut transport_failure = None;
        let mut events = VecDeque::from([event]);

        while let Some(event) = events.pop_front() {
            let effects = self.apply(session_id, event)?;

            for effect in effects {
                match effect {
                    Effect::SendStart { message } => {
                        let request = StartRequest {
                            session_id: session_id.to_string(),
                            message,
                        };
                        let result = self.transport.start(&request).await;
                        events.push_back(response_event(session_id, result, &mut transport_failure));
                    }
                    Effect::SendResume { reply } => {
                        let request = ResumeRequest::new(session_id, &reply);
                        let result = self.transport.resume(&request).await;
                        events.push_back(response_event(session_id, result, &mut transport_failure));
                    }
                    Effect::SendReset => match self.transport.reset(session_id).await {
                        Ok(dropped) => output.push(Effect::SessionReset { dropped }),
                        Err(TransportError::Rejected(rejection)) => output.push(Effect::ShowError {
                            code: rejection.code,
                            message: rejection.error,
                        }),
                        Err(e) => transport_failure = Some(e.to_string()),
                    },
                    other => output.push(other),
                }
            }
        }

        match transport_failure {
            Some(message) => Err(ClientError::Transport(message)),
            None => Ok(Update {
                state: self.state(session_id),
                output,
            }),
        }
    }

    /// Run one transition atomically against the stored state
    fn apply(&self, session_id: &str, event: ClientEvent) -> Result<Vec<Effect>, TransitionError> {
        let mut entry = self.sessions.entry(session_id.to_string()).or_default();
        let result = transition(&entry, event)?;
        *entry = result.new_state;
        Ok(result.effects)
    }
}

/// Turn a transport result into the event that feeds back into the machine,
/// noting a transport failure for the caller
fn response_event(
    session_id: &str,
    result: Result<WorkflowOutcome, TransportError>,
    transport_failure: &mut Option<String>,
) -> ClientEvent {
    match result {
        Ok(outcome) => ClientEvent::Response(outcome),
        Err(TransportError::Rejected(rejection)) => ClientEvent::Rejected {
            code: rejection.code,
            message: rejection.error,
        },
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Request failed in transport");
            let message = e.to_string();
            *transport_failure = Some(message.clone());
            ClientEvent::TransportFailed { message }
        }
    }
}
