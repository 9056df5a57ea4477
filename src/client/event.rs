//! Events that drive the client state machine

use crate::protocol::{ErrorCode, WorkflowOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    // User events
    /// A line typed by the user; routed by the current state
    UserInput { text: String },
    /// Explicit request to begin a new task
    Start { message: String },
    Retry,
    Abandon,

    // Server events
    Response(WorkflowOutcome),
    Rejected { code: ErrorCode, message: String },
    /// Nothing usable came back (network error, unparseable body)
    TransportFailed { message: String },
}
