//! Per-session client state

use crate::protocol::{Reply, TaskHandle};
use serde::{Deserialize, Serialize};

/// Where one session stands from the client's point of view.
///
/// The task id and its interrupt travel together inside [`TaskHandle`], so
/// the client can never hold one without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerState {
    /// Nothing pending
    Idle {
        /// Message of a start that never got an answer
        #[serde(default)]
        retry_message: Option<String>,
    },

    /// Start request on the wire
    Starting { message: String },

    /// Suspended task waiting for the user
    AwaitingReply {
        pending: TaskHandle,
        /// Reply of a resume that never got an answer
        #[serde(default)]
        retry_reply: Option<Reply>,
    },

    /// Resume request on the wire
    Replying { pending: TaskHandle, reply: Reply },
}

impl Default for ControllerState {
    fn default() -> Self {
        ControllerState::Idle {
            retry_message: None,
        }
    }
}

impl ControllerState {
    pub fn pending(&self) -> Option<&TaskHandle> {
        match self {
            ControllerState::AwaitingReply { pending, .. }
            | ControllerState::Replying { pending, .. } => Some(pending),
            ControllerState::Idle { .. } | ControllerState::Starting { .. } => None,
        }
    }

    /// A request is on the wire
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            ControllerState::Starting { .. } | ControllerState::Replying { .. }
        )
    }

    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            ControllerState::Idle {
                retry_message: Some(_)
            } | ControllerState::AwaitingReply {
                retry_reply: Some(_),
                ..
            }
        )
    }
}
