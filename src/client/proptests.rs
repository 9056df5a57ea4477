//! Property-based tests for the client state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::protocol::{ErrorCode, Failure, Interrupt, InterruptKind, Reply, TaskHandle, WorkflowOutcome};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_interrupt() -> impl Strategy<Value = Interrupt> {
    prop_oneof![
        Just(Interrupt::confirmation("Proceed?")),
        proptest::collection::vec("[A-Z][a-z]{0,6}", 1..5)
            .prop_map(|labels| Interrupt::choice("Pick one", labels)),
        Just(Interrupt::free_text("Enter report details")),
    ]
}

fn arb_handle() -> impl Strategy<Value = TaskHandle> {
    ("t[0-9]{1,3}", arb_interrupt())
        .prop_map(|(task_id, interrupt)| TaskHandle::new(task_id, interrupt).unwrap())
}

fn arb_outcome() -> impl Strategy<Value = WorkflowOutcome> {
    prop_oneof![
        3 => arb_handle().prop_map(WorkflowOutcome::Suspended),
        1 => Just(WorkflowOutcome::Completed(json!({"path": "/docs/report.pdf"}))),
        1 => Just(WorkflowOutcome::Failed(Failure::new("cancelled"))),
    ]
}

fn arb_code() -> impl Strategy<Value = ErrorCode> {
    prop_oneof![
        Just(ErrorCode::SessionBusy),
        Just(ErrorCode::NoPendingTask),
        Just(ErrorCode::ReplyKindMismatch),
        Just(ErrorCode::InvalidReply),
        Just(ErrorCode::CallInFlight),
        Just(ErrorCode::InvalidRequest),
        Just(ErrorCode::WorkflowUnavailable),
    ]
}

fn arb_event() -> impl Strategy<Value = ClientEvent> {
    prop_oneof![
        prop_oneof![
            Just("yes".to_string()),
            Just("no".to_string()),
            "[0-5]",
            "[a-z ]{0,12}",
        ]
        .prop_map(|text| ClientEvent::UserInput { text }),
        "[a-z ]{0,12}".prop_map(|message| ClientEvent::Start { message }),
        Just(ClientEvent::Retry),
        Just(ClientEvent::Abandon),
        arb_outcome().prop_map(ClientEvent::Response),
        arb_code().prop_map(|code| ClientEvent::Rejected {
            code,
            message: "refused".to_string()
        }),
        Just(ClientEvent::TransportFailed {
            message: "connection refused".to_string()
        }),
    ]
}

// ============================================================================
// Invariant Helpers
// ============================================================================

fn requests(effects: &[Effect]) -> usize {
    effects.iter().filter(|effect| effect.is_request()).count()
}

/// A request effect must match the state it leaves the machine in
fn request_matches_state(effects: &[Effect], state: &ControllerState) -> bool {
    effects.iter().all(|effect| match effect {
        Effect::SendStart { message } => {
            matches!(state, ControllerState::Starting { message: m } if m == message)
        }
        Effect::SendResume { reply } => {
            matches!(state, ControllerState::Replying { reply: r, .. } if r == reply)
        }
        Effect::SendReset => *state == ControllerState::default(),
        _ => true,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn prop_effects_agree_with_state(events in proptest::collection::vec(arb_event(), 0..25)) {
        let mut state = ControllerState::default();
        for event in events {
            if let Ok(result) = transition(&state, event) {
                prop_assert!(requests(&result.effects) <= 1, "effects {:?}", result.effects);
                prop_assert!(
                    request_matches_state(&result.effects, &result.new_state),
                    "effects {:?} for state {:?}",
                    result.effects,
                    result.new_state
                );
                state = result.new_state;
            }
        }
    }

    #[test]
    fn prop_input_while_awaiting_never_starts(
        handle in arb_handle(),
        text in "[a-z0-9 ]{0,12}",
    ) {
        let state = ControllerState::AwaitingReply { pending: handle, retry_reply: None };
        if let Ok(result) = transition(&state, ClientEvent::UserInput { text }) {
            prop_assert!(
                matches!(result.new_state, ControllerState::Replying { .. }),
                "expected Replying, got {:?}",
                result.new_state
            );
            prop_assert!(
                !result.effects.iter().any(|e| matches!(e, Effect::SendStart { .. })),
                "input started a task: {:?}",
                result.effects
            );
        }
    }

    #[test]
    fn prop_suspension_records_the_whole_handle(
        waiting in prop_oneof![
            Just(ControllerState::Starting { message: "create report".to_string() }),
            arb_handle().prop_map(|pending| ControllerState::Replying {
                pending,
                reply: Reply::new("yes", InterruptKind::Confirmation),
            }),
        ],
        next in arb_handle(),
    ) {
        let result = transition(&waiting, ClientEvent::Response(WorkflowOutcome::Suspended(next.clone()))).unwrap();
        prop_assert_eq!(result.new_state.pending(), Some(&next));
        prop_assert!(!result.new_state.is_waiting());
    }

    #[test]
    fn prop_transport_failure_only_clears_waiting(
        pending in arb_handle(),
        raw in "[a-z]{1,8}",
    ) {
        let reply = Reply::new(raw, pending.kind());
        let state = ControllerState::Replying { pending: pending.clone(), reply: reply.clone() };
        let result = transition(&state, ClientEvent::TransportFailed { message: "timeout".to_string() }).unwrap();

        prop_assert_eq!(
            result.new_state,
            ControllerState::AwaitingReply { pending, retry_reply: Some(reply) }
        );
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn prop_waiting_states_accept_no_user_events(
        pending in arb_handle(),
        event in prop_oneof![
            "[a-z]{1,8}".prop_map(|text| ClientEvent::UserInput { text }),
            Just(ClientEvent::Retry),
            Just(ClientEvent::Abandon),
        ],
    ) {
        let state = ControllerState::Replying {
            pending: pending.clone(),
            reply: Reply::new("x", pending.kind()),
        };
        prop_assert_eq!(transition(&state, event).unwrap_err(), TransitionError::Busy);
    }
}
