//! Replies to pending interrupts and their normalization

use super::interrupt::{Choice, Interrupt, InterruptKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Only accepted affirmative token for confirmation prompts
pub const AFFIRMATIVE: &str = "yes";
/// Only accepted negative token for confirmation prompts
pub const NEGATIVE: &str = "no";

/// A client-submitted answer, as received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub raw_value: String,
    pub reply_kind: InterruptKind,
}

/// A reply after it has been checked against the pending interrupt.
/// This is what the workflow receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedReply {
    Confirmation { confirmed: bool },
    Choice { index: u32, value: String },
    FreeText { text: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply answers a {received} prompt but a {expected} reply is pending")]
    KindMismatch {
        expected: InterruptKind,
        received: InterruptKind,
    },
    #[error("expected \"yes\" or \"no\", got {0:?}")]
    NotAConfirmation(String),
    #[error("{0:?} is not one of the offered choice numbers")]
    UnknownChoice(String),
    #[error("reply text must not be blank")]
    BlankText,
}

impl Reply {
    pub fn new(raw_value: impl Into<String>, reply_kind: InterruptKind) -> Self {
        Self {
            raw_value: raw_value.into(),
            reply_kind,
        }
    }

    /// Shape user input for a pending interrupt, rejecting it locally when it
    /// could never be accepted.
    pub fn shaped(interrupt: &Interrupt, input: &str) -> Result<Self, ReplyError> {
        let reply = Self::new(input.trim(), interrupt.kind());
        reply.resolve(interrupt)?;
        Ok(reply)
    }

    /// Check this reply against the pending interrupt and normalize it.
    /// Choice replies resolve from their 1-based index to the choice label.
    pub fn resolve(&self, interrupt: &Interrupt) -> Result<ResolvedReply, ReplyError> {
        let expected = interrupt.kind();
        if self.reply_kind != expected {
            return Err(ReplyError::KindMismatch {
                expected,
                received: self.reply_kind,
            });
        }

        match interrupt {
            Interrupt::Confirmation { .. } => parse_confirmation(&self.raw_value)
                .map(|confirmed| ResolvedReply::Confirmation { confirmed })
                .ok_or_else(|| ReplyError::NotAConfirmation(self.raw_value.clone())),
            Interrupt::Choice { choices, .. } => find_choice(choices, &self.raw_value)
                .map(|choice| ResolvedReply::Choice {
                    index: choice.index,
                    value: choice.label.clone(),
                })
                .ok_or_else(|| ReplyError::UnknownChoice(self.raw_value.clone())),
            Interrupt::FreeText { .. } => {
                if self.raw_value.trim().is_empty() {
                    Err(ReplyError::BlankText)
                } else {
                    Ok(ResolvedReply::FreeText {
                        text: self.raw_value.clone(),
                    })
                }
            }
        }
    }
}

fn parse_confirmation(raw: &str) -> Option<bool> {
    let token = raw.trim();
    if token.eq_ignore_ascii_case(AFFIRMATIVE) {
        Some(true)
    } else if token.eq_ignore_ascii_case(NEGATIVE) {
        Some(false)
    } else {
        None
    }
}

fn find_choice<'a>(choices: &'a [Choice], raw: &str) -> Option<&'a Choice> {
    let index: u32 = raw.trim().parse().ok()?;
    choices.iter().find(|choice| choice.index == index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_index_resolves_to_label() {
        let interrupt = Interrupt::choice("Pick", ["A", "B", "C"]);
        let reply = Reply::new("2", InterruptKind::Choice);
        assert_eq!(
            reply.resolve(&interrupt),
            Ok(ResolvedReply::Choice {
                index: 2,
                value: "B".to_string()
            })
        );
    }

    #[test]
    fn choice_index_zero_is_never_valid() {
        let interrupt = Interrupt::choice("Pick", ["A", "B"]);
        let reply = Reply::new("0", InterruptKind::Choice);
        assert_eq!(
            reply.resolve(&interrupt),
            Err(ReplyError::UnknownChoice("0".to_string()))
        );
    }

    #[test]
    fn choice_label_text_is_not_an_index() {
        let interrupt = Interrupt::choice("Pick", ["A", "B"]);
        let reply = Reply::new("A", InterruptKind::Choice);
        assert!(matches!(
            reply.resolve(&interrupt),
            Err(ReplyError::UnknownChoice(_))
        ));
    }

    #[test]
    fn confirmation_accepts_only_the_token_pair() {
        let interrupt = Interrupt::confirmation("Proceed?");
        for (raw, expected) in [("yes", true), ("NO", false), (" Yes ", true)] {
            let reply = Reply::new(raw, InterruptKind::Confirmation);
            assert_eq!(
                reply.resolve(&interrupt),
                Ok(ResolvedReply::Confirmation {
                    confirmed: expected
                })
            );
        }
        let reply = Reply::new("sure", InterruptKind::Confirmation);
        assert!(matches!(
            reply.resolve(&interrupt),
            Err(ReplyError::NotAConfirmation(_))
        ));
    }

    #[test]
    fn mismatched_kind_is_rejected_before_parsing() {
        let interrupt = Interrupt::choice("Pick", ["A", "B"]);
        let reply = Reply::new("2", InterruptKind::FreeText);
        assert_eq!(
            reply.resolve(&interrupt),
            Err(ReplyError::KindMismatch {
                expected: InterruptKind::Choice,
                received: InterruptKind::FreeText,
            })
        );
    }

    #[test]
    fn free_text_keeps_text_verbatim() {
        let interrupt = Interrupt::free_text("Details?");
        let reply = Reply::new("Q3 sales visit", InterruptKind::FreeText);
        assert_eq!(
            reply.resolve(&interrupt),
            Ok(ResolvedReply::FreeText {
                text: "Q3 sales visit".to_string()
            })
        );
        let blank = Reply::new("   ", InterruptKind::FreeText);
        assert_eq!(blank.resolve(&interrupt), Err(ReplyError::BlankText));
    }

    #[test]
    fn shaped_takes_kind_from_interrupt() {
        let interrupt = Interrupt::confirmation("Proceed?");
        let reply = Reply::shaped(&interrupt, "  yes\n").unwrap();
        assert_eq!(reply, Reply::new("yes", InterruptKind::Confirmation));
        assert!(Reply::shaped(&interrupt, "maybe").is_err());
    }
}
