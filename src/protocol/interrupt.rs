//! Interrupt descriptors and resumable task handles

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reply shape a suspended workflow is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterruptKind {
    Confirmation,
    Choice,
    FreeText,
}

impl InterruptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InterruptKind::Confirmation => "confirmation",
            InterruptKind::Choice => "choice",
            InterruptKind::FreeText => "freeText",
        }
    }
}

impl fmt::Display for InterruptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable option of a choice interrupt.
///
/// Indices start at 1 so they line up with the "choose 1, 2, 3" prompt the
/// user sees; 0 is never a valid index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Choice {
    pub index: u32,
    pub label: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterruptError {
    #[error("task id must not be empty")]
    EmptyTaskId,
    #[error("prompt text must not be empty")]
    EmptyPrompt,
    #[error("choice interrupt needs at least one choice")]
    NoChoices,
    #[error("choice at position {position} has index {index}, expected {expected}")]
    ChoiceIndex {
        position: usize,
        index: u32,
        expected: u32,
    },
    #[error("choice {0} has an empty label")]
    EmptyChoiceLabel(u32),
}

/// What a suspended workflow is waiting for.
///
/// Each kind carries exactly the fields it needs, so a choice list can only
/// exist on a choice prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Interrupt {
    Confirmation { prompt: String },
    Choice { prompt: String, choices: Vec<Choice> },
    FreeText { prompt: String },
}

impl Interrupt {
    pub fn confirmation(prompt: impl Into<String>) -> Self {
        Interrupt::Confirmation {
            prompt: prompt.into(),
        }
    }

    /// Build a choice prompt, numbering the labels from 1 in order
    pub fn choice<I, S>(prompt: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = labels
            .into_iter()
            .zip(1u32..)
            .map(|(label, index)| Choice {
                index,
                label: label.into(),
            })
            .collect();
        Interrupt::Choice {
            prompt: prompt.into(),
            choices,
        }
    }

    pub fn free_text(prompt: impl Into<String>) -> Self {
        Interrupt::FreeText {
            prompt: prompt.into(),
        }
    }

    pub fn kind(&self) -> InterruptKind {
        match self {
            Interrupt::Confirmation { .. } => InterruptKind::Confirmation,
            Interrupt::Choice { .. } => InterruptKind::Choice,
            Interrupt::FreeText { .. } => InterruptKind::FreeText,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Interrupt::Confirmation { prompt }
            | Interrupt::Choice { prompt, .. }
            | Interrupt::FreeText { prompt } => prompt,
        }
    }

    /// Offered choices; empty for non-choice kinds
    pub fn choices(&self) -> &[Choice] {
        match self {
            Interrupt::Choice { choices, .. } => choices,
            _ => &[],
        }
    }

    pub fn validate(&self) -> Result<(), InterruptError> {
        if self.prompt().trim().is_empty() {
            return Err(InterruptError::EmptyPrompt);
        }

        if let Interrupt::Choice { choices, .. } = self {
            if choices.is_empty() {
                return Err(InterruptError::NoChoices);
            }
            for (position, (choice, expected)) in choices.iter().zip(1u32..).enumerate() {
                if choice.index != expected {
                    return Err(InterruptError::ChoiceIndex {
                        position,
                        index: choice.index,
                        expected,
                    });
                }
                if choice.label.trim().is_empty() {
                    return Err(InterruptError::EmptyChoiceLabel(choice.index));
                }
            }
        }

        Ok(())
    }
}

/// One suspended workflow execution and the input it is waiting for.
///
/// Only constructible through [`TaskHandle::new`] (or deserialization, which
/// runs the same checks), so every handle in the system is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTaskHandle")]
pub struct TaskHandle {
    task_id: String,
    interrupt: Interrupt,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>, interrupt: Interrupt) -> Result<Self, InterruptError> {
        let task_id = task_id.into();
        if task_id.trim().is_empty() {
            return Err(InterruptError::EmptyTaskId);
        }
        interrupt.validate()?;
        Ok(Self { task_id, interrupt })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn kind(&self) -> InterruptKind {
        self.interrupt.kind()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTaskHandle {
    task_id: String,
    interrupt: Interrupt,
}

impl TryFrom<RawTaskHandle> for TaskHandle {
    type Error = InterruptError;

    fn try_from(raw: RawTaskHandle) -> Result<Self, Self::Error> {
        TaskHandle::new(raw.task_id, raw.interrupt)
    }
}
