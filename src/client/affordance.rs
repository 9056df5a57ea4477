//! Input controls for pending interrupts

use crate::protocol::{Choice, Interrupt, AFFIRMATIVE, NEGATIVE};
use std::fmt::Write as _;

/// How the user should be asked to answer a pending interrupt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAffordance {
    /// Two buttons: yes / no
    YesNo { prompt: String },
    /// Numbered options
    Numbered { prompt: String, choices: Vec<Choice> },
    /// A text box
    Text { prompt: String },
}

impl From<&Interrupt> for InputAffordance {
    fn from(interrupt: &Interrupt) -> Self {
        match interrupt {
            Interrupt::Confirmation { prompt } => InputAffordance::YesNo {
                prompt: prompt.clone(),
            },
            Interrupt::Choice { prompt, choices } => InputAffordance::Numbered {
                prompt: prompt.clone(),
                choices: choices.clone(),
            },
            Interrupt::FreeText { prompt } => InputAffordance::Text {
                prompt: prompt.clone(),
            },
        }
    }
}

impl InputAffordance {
    pub fn prompt(&self) -> &str {
        match self {
            InputAffordance::YesNo { prompt }
            | InputAffordance::Numbered { prompt, .. }
            | InputAffordance::Text { prompt } => prompt,
        }
    }

    /// Plain-text rendering for terminal clients
    pub fn render(&self) -> String {
        match self {
            InputAffordance::YesNo { prompt } => format!("{prompt} [{AFFIRMATIVE}/{NEGATIVE}]"),
            InputAffordance::Numbered { prompt, choices } => {
                let mut out = prompt.clone();
                for choice in choices {
                    let _ = write!(out, "\n  {}. {}", choice.index, choice.label);
                }
                let _ = write!(out, "\nEnter a number (1-{})", choices.len());
                out
            }
            InputAffordance::Text { prompt } => format!("{prompt}\n(free text)"),
        }
    }
}
