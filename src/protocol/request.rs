//! Request and rejection bodies

use super::interrupt::InterruptKind;
use super::reply::Reply;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /v1/start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartRequest {
    pub session_id: String,
    pub message: String,
}

/// Body of `POST /v1/resume`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResumeRequest {
    pub session_id: String,
    pub reply: String,
    pub reply_kind: InterruptKind,
}

impl ResumeRequest {
    pub fn new(session_id: impl Into<String>, reply: &Reply) -> Self {
        Self {
            session_id: session_id.into(),
            reply: reply.raw_value.clone(),
            reply_kind: reply.reply_kind,
        }
    }

    pub fn to_reply(&self) -> Reply {
        Reply::new(self.reply.clone(), self.reply_kind)
    }
}

/// Body of `POST /v1/sessions/:session_id/reset`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Whether a pending task was dropped
    pub reset: bool,
}

/// Machine-readable reason a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    SessionBusy,
    NoPendingTask,
    ReplyKindMismatch,
    InvalidReply,
    CallInFlight,
    InvalidRequest,
    WorkflowUnavailable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SessionBusy => "session_busy",
            ErrorCode::NoPendingTask => "no_pending_task",
            ErrorCode::ReplyKindMismatch => "reply_kind_mismatch",
            ErrorCode::InvalidReply => "invalid_reply",
            ErrorCode::CallInFlight => "call_in_flight",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::WorkflowUnavailable => "workflow_unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body returned with every non-2xx protocol response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub error: String,
    pub code: ErrorCode,
}

impl Rejection {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
        }
    }
}
