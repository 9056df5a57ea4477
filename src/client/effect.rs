//! Effects produced by client transitions

use super::affordance::InputAffordance;
use crate::protocol::{ErrorCode, Failure, Reply};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Call `/v1/start`
    SendStart { message: String },

    /// Call `/v1/resume`
    SendResume { reply: Reply },

    /// Call `/v1/sessions/:session_id/reset`
    SendReset,

    /// Render the input control for a pending interrupt
    ShowPrompt(InputAffordance),

    ShowResult(Value),

    ShowFailure(Failure),

    /// Server refused the request
    ShowError { code: ErrorCode, message: String },

    /// Server-side session was reset
    SessionReset { dropped: bool },
}

impl Effect {
    /// Effects that talk to the server rather than the user
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Effect::SendStart { .. } | Effect::SendResume { .. } | Effect::SendReset
        )
    }
}
