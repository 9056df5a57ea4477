//! Response envelope
//!
//! The single wire shape every start/resume response uses. Decoding is strict:
//! a payload that does not match this exact shape is an error, never a
//! fallback to some older layout.

use super::interrupt::{Choice, Interrupt, InterruptError, InterruptKind, TaskHandle};
use super::outcome::{Failure, WorkflowOutcome};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope requests more input but also carries a failure")]
    SuspendedWithFailure,
    #[error("envelope is missing `{0}`")]
    MissingField(&'static str),
    #[error("envelope must not carry `{0}` here")]
    UnexpectedField(&'static str),
    #[error("invalid interrupt: {0}")]
    Interrupt(#[from] InterruptError),
}

/// Wire form of a [`WorkflowOutcome`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Envelope {
    pub requires_more_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt_kind: Option<InterruptKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Present (possibly `null`) iff `success` is true
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Distinguish an explicit `null` from an absent field
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Envelope {
    fn empty(requires_more_input: bool) -> Self {
        Self {
            requires_more_input,
            task_id: None,
            interrupt_kind: None,
            prompt_text: None,
            choices: None,
            success: None,
            result: None,
            error: None,
            code: None,
        }
    }

    /// Decode and validate a response body
    pub fn decode(body: &[u8]) -> Result<WorkflowOutcome, EnvelopeError> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        envelope.into_outcome()
    }

    /// Validate the field combination and convert into an outcome
    pub fn into_outcome(self) -> Result<WorkflowOutcome, EnvelopeError> {
        if self.requires_more_input {
            self.into_suspension()
        } else {
            self.into_terminal()
        }
    }

    fn into_suspension(self) -> Result<WorkflowOutcome, EnvelopeError> {
        if self.error.is_some() || self.code.is_some() || self.success == Some(false) {
            return Err(EnvelopeError::SuspendedWithFailure);
        }
        if self.success.is_some() {
            return Err(EnvelopeError::UnexpectedField("success"));
        }
        if self.result.is_some() {
            return Err(EnvelopeError::UnexpectedField("result"));
        }

        let task_id = self.task_id.ok_or(EnvelopeError::MissingField("taskId"))?;
        let kind = self
            .interrupt_kind
            .ok_or(EnvelopeError::MissingField("interruptKind"))?;
        let prompt = self
            .prompt_text
            .ok_or(EnvelopeError::MissingField("promptText"))?;

        let interrupt = match (kind, self.choices) {
            (InterruptKind::Choice, Some(choices)) => Interrupt::Choice { prompt, choices },
            (InterruptKind::Choice, None) => return Err(EnvelopeError::MissingField("choices")),
            (_, Some(_)) => return Err(EnvelopeError::UnexpectedField("choices")),
            (InterruptKind::Confirmation, None) => Interrupt::Confirmation { prompt },
            (InterruptKind::FreeText, None) => Interrupt::FreeText { prompt },
        };

        Ok(WorkflowOutcome::Suspended(TaskHandle::new(
            task_id, interrupt,
        )?))
    }

    fn into_terminal(self) -> Result<WorkflowOutcome, EnvelopeError> {
        if self.task_id.is_some() {
            return Err(EnvelopeError::UnexpectedField("taskId"));
        }
        if self.interrupt_kind.is_some() {
            return Err(EnvelopeError::UnexpectedField("interruptKind"));
        }
        if self.prompt_text.is_some() {
            return Err(EnvelopeError::UnexpectedField("promptText"));
        }
        if self.choices.is_some() {
            return Err(EnvelopeError::UnexpectedField("choices"));
        }

        if self.success.ok_or(EnvelopeError::MissingField("success"))? {
            if self.error.is_some() {
                return Err(EnvelopeError::UnexpectedField("error"));
            }
            if self.code.is_some() {
                return Err(EnvelopeError::UnexpectedField("code"));
            }
            let result = self.result.ok_or(EnvelopeError::MissingField("result"))?;
            Ok(WorkflowOutcome::Completed(result))
        } else {
            if self.result.is_some() {
                return Err(EnvelopeError::UnexpectedField("result"));
            }
            let message = self.error.ok_or(EnvelopeError::MissingField("error"))?;
            Ok(WorkflowOutcome::Failed(Failure {
                message,
                code: self.code,
            }))
        }
    }
}

impl From<&WorkflowOutcome> for Envelope {
    fn from(outcome: &WorkflowOutcome) -> Self {
        match outcome {
            WorkflowOutcome::Suspended(handle) => {
                let interrupt = handle.interrupt();
                let choices = match interrupt {
                    Interrupt::Choice { choices, .. } => Some(choices.clone()),
                    _ => None,
                };
                Self {
                    task_id: Some(handle.task_id().to_string()),
                    interrupt_kind: Some(interrupt.kind()),
                    prompt_text: Some(interrupt.prompt().to_string()),
                    choices,
                    ..Self::empty(true)
                }
            }
            WorkflowOutcome::Completed(result) => Self {
                success: Some(true),
                result: Some(result.clone()),
                ..Self::empty(false)
            },
            WorkflowOutcome::Failed(failure) => Self {
                success: Some(false),
                error: Some(failure.message.clone()),
                code: failure.code.clone(),
                ..Self::empty(false)
            },
        }
    }
}
