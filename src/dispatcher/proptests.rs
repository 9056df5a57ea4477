//! Property-based tests for the dispatcher
//!
//! Arbitrary start/resume/reset sequences against a scripted workflow must
//! keep the session store consistent with what the workflow reported.

use super::*;
use crate::protocol::Interrupt;
use crate::workflow::testing::ScriptedWorkflow;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_interrupt() -> impl Strategy<Value = Interrupt> {
    prop_oneof![
        "[A-Za-z][A-Za-z ?]{0,19}".prop_map(Interrupt::confirmation),
        proptest::collection::vec("[A-Z][a-z]{0,8}", 1..5)
            .prop_map(|labels| Interrupt::choice("Pick one", labels)),
        "[A-Za-z][A-Za-z ]{0,19}".prop_map(Interrupt::free_text),
    ]
}

type Step = Result<WorkflowOutcome, WorkflowError>;

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => ("t[0-9]{1,3}", arb_interrupt()).prop_map(|(task_id, interrupt)| -> Step {
            Ok(WorkflowOutcome::Suspended(TaskHandle::new(task_id, interrupt).unwrap()))
        }),
        2 => Just::<Step>(Ok(WorkflowOutcome::Completed(json!({"path": "/docs/report.pdf"})))),
        1 => Just::<Step>(Ok(WorkflowOutcome::Failed(Failure::new("cancelled")))),
        1 => Just::<Step>(Err(WorkflowError::Interrupted("connection reset".to_string()))),
        1 => Just::<Step>(Err(WorkflowError::UnknownTask("gone".to_string()))),
    ]
}

fn arb_kind() -> impl Strategy<Value = InterruptKind> {
    prop_oneof![
        Just(InterruptKind::Confirmation),
        Just(InterruptKind::Choice),
        Just(InterruptKind::FreeText),
    ]
}

fn arb_reply() -> impl Strategy<Value = Reply> {
    let raw = prop_oneof![
        Just("yes".to_string()),
        Just("NO".to_string()),
        Just("0".to_string()),
        "[1-5]",
        Just(String::new()),
        "[a-z ]{1,12}",
    ];
    (raw, arb_kind()).prop_map(|(raw, kind)| Reply::new(raw, kind))
}

#[derive(Debug, Clone)]
enum Op {
    Start,
    Resume(Reply),
    Reset,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Start),
        3 => arb_reply().prop_map(Op::Resume),
        1 => Just(Op::Reset),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_store_tracks_reported_outcomes(
        steps in proptest::collection::vec(arb_step(), 0..30),
        ops in proptest::collection::vec(arb_op(), 1..30),
    ) {
        let rt = runtime();
        let workflow = Arc::new(ScriptedWorkflow::new());
        for step in steps {
            match step {
                Ok(outcome) => workflow.queue(outcome),
                Err(error) => workflow.queue_error(error),
            };
        }
        let dispatcher = ResumeDispatcher::new(Arc::clone(&workflow));
        let store = dispatcher.store().clone();

        for op in ops {
            let before = store.pending("s1");
            let result = match &op {
                Op::Start => rt.block_on(dispatcher.start("s1", "create report")),
                Op::Resume(reply) => rt.block_on(dispatcher.resume("s1", reply)),
                Op::Reset => {
                    let reset = dispatcher.reset("s1");
                    prop_assert_eq!(reset, Ok(before.is_some()));
                    prop_assert_eq!(store.pending("s1"), None);
                    continue;
                }
            };
            let after = store.pending("s1");

            prop_assert!(store.pending_count() <= 1);
            prop_assert!(!store.snapshot("s1").in_flight);

            match result {
                Ok(outcome) => {
                    if matches!(op, Op::Start) {
                        prop_assert!(before.is_none());
                    } else {
                        prop_assert!(before.is_some());
                    }
                    prop_assert_eq!(after.as_ref(), outcome.handle());
                }
                Err(DispatchError::SessionBusy { task_id, .. }) => {
                    prop_assert_eq!(before.as_ref().map(|h| h.task_id().to_string()), Some(task_id));
                    prop_assert_eq!(after, before);
                }
                Err(DispatchError::NoPendingTask(_)) => {
                    prop_assert!(before.is_none());
                    prop_assert!(after.is_none());
                }
                Err(error) => {
                    prop_assert!(matches!(
                        error,
                        DispatchError::ReplyKindMismatch { .. }
                            | DispatchError::InvalidReply(_)
                            | DispatchError::WorkflowUnavailable(_)
                    ), "unexpected error {:?}", error);
                    prop_assert_eq!(after, before);
                }
            }
        }
    }

    #[test]
    fn prop_mismatched_kind_never_reaches_workflow(
        interrupt in arb_interrupt(),
        reply in arb_reply(),
    ) {
        prop_assume!(reply.reply_kind != interrupt.kind());
        let rt = runtime();
        let workflow = Arc::new(ScriptedWorkflow::new());
        workflow.queue(WorkflowOutcome::Suspended(TaskHandle::new("t1", interrupt).unwrap()));
        let dispatcher = ResumeDispatcher::new(Arc::clone(&workflow));

        rt.block_on(dispatcher.start("s1", "create report")).unwrap();
        let before = dispatcher.store().pending("s1");
        let result = rt.block_on(dispatcher.resume("s1", &reply));

        prop_assert!(
            matches!(result, Err(DispatchError::ReplyKindMismatch { .. })),
            "expected ReplyKindMismatch, got {:?}",
            result
        );
        prop_assert_eq!(dispatcher.store().pending("s1"), before);
        prop_assert_eq!(workflow.recorded_calls().len(), 1);
    }

    #[test]
    fn prop_retry_after_transient_failure_matches_first_success(
        interrupt in arb_interrupt(),
        next in arb_step(),
    ) {
        let next = match next {
            Ok(outcome) => outcome,
            Err(_) => WorkflowOutcome::Completed(json!(null)),
        };
        let reply = match interrupt.kind() {
            InterruptKind::Confirmation => Reply::new("yes", InterruptKind::Confirmation),
            InterruptKind::Choice => Reply::new("1", InterruptKind::Choice),
            InterruptKind::FreeText => Reply::new("Q3 sales visit", InterruptKind::FreeText),
        };

        let rt = runtime();
        let workflow = Arc::new(ScriptedWorkflow::new());
        workflow
            .queue(WorkflowOutcome::Suspended(TaskHandle::new("t1", interrupt).unwrap()))
            .queue_error(WorkflowError::Interrupted("connection reset".to_string()))
            .queue(next.clone());
        let dispatcher = ResumeDispatcher::new(Arc::clone(&workflow));

        rt.block_on(dispatcher.start("s1", "create report")).unwrap();
        let failed = rt.block_on(dispatcher.resume("s1", &reply));
        prop_assert!(matches!(failed, Err(DispatchError::WorkflowUnavailable(_))));

        let retried = rt.block_on(dispatcher.resume("s1", &reply)).unwrap();
        prop_assert_eq!(&retried, &next);

        let calls = workflow.recorded_calls();
        prop_assert_eq!(&calls[1], &calls[2]);
    }
}
