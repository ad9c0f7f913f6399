//! Property-based tests for RequestWorkflow.
//!
//! - Skip-level prevention for every configured level layout
//! - current_level is 0 exactly when the request is not pending review
//! - Failed operations leave the input request untouched

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use spendline_shared::ControlSettings;

use crate::routing::{ApprovalLine, ApprovalSetting, LevelApprover, LineLevel};
use crate::settings::StaticSettings;
use crate::workflow::request::{LineItem, SpendRequest};
use crate::workflow::service::RequestWorkflow;
use crate::workflow::types::{Actor, ApprovalIntent, RequestStatus, TransitionContext};

const APPROVERS: [&str; 3] = ["alice", "bob", "carol"];

/// Strategy for which of the three levels are configured.
fn arb_layout() -> impl Strategy<Value = [bool; 3]> {
    any::<[bool; 3]>()
}

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a workflow step: 0 advance, 1 final, 2 reject, 3 reopen, 4 wrong approver.
fn arb_steps() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..5, 0..12)
}

fn setting(layout: [bool; 3]) -> ApprovalSetting {
    let mut line = ApprovalLine::default_line(Decimal::ZERO, None);
    for (idx, configured) in layout.iter().enumerate() {
        if *configured {
            let level = u8::try_from(idx + 1).unwrap();
            line = line.level(level, LineLevel::new(LevelApprover::user(APPROVERS[idx])));
        }
    }
    ApprovalSetting::new("Props", "CC-PROP").with_line(line)
}

fn workflow(layout: [bool; 3]) -> RequestWorkflow {
    let settings = Arc::new(StaticSettings::new(ControlSettings::default()));
    settings.put_approval_setting(setting(layout));
    RequestWorkflow::new(settings)
}

fn draft(amount: Decimal) -> SpendRequest {
    SpendRequest::draft("ER-PROP", "erin", "CC-PROP").with_item(LineItem::new("5110", amount))
}

fn approver_for(request: &SpendRequest) -> Actor {
    let idx = usize::from(request.current_level.max(1) - 1);
    Actor::new(APPROVERS[idx])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Final approval succeeds only at the last configured level.
    #[test]
    fn prop_final_only_at_last_level(layout in arb_layout(), amount in positive_amount()) {
        let workflow = workflow(layout);
        let ctx = TransitionContext::default();
        let mut request = workflow.submit(&draft(amount), &Actor::new("erin"), &ctx).unwrap().request;

        let configured = layout.iter().filter(|c| **c).count();
        if configured == 0 {
            prop_assert_eq!(request.status, RequestStatus::Approved);
            return Ok(());
        }

        for step in 1..=configured {
            let actor = approver_for(&request);
            let last = step == configured;
            let final_attempt = workflow.approve(&request, &actor, ApprovalIntent::Final, &ctx);
            prop_assert_eq!(final_attempt.is_ok(), last);
            request = workflow
                .approve(&request, &actor, ApprovalIntent::Advance, &ctx)
                .unwrap()
                .request;
        }
        prop_assert_eq!(request.status, RequestStatus::Approved);
    }

    /// current_level is 0 exactly when the request is not pending review.
    #[test]
    fn prop_level_zero_iff_not_pending(
        layout in arb_layout(),
        amount in positive_amount(),
        steps in arb_steps(),
    ) {
        let workflow = workflow(layout);
        let ctx = TransitionContext::default();
        let manager = Actor::new("dana").with_role("Accounts Manager");
        let mut request = workflow.submit(&draft(amount), &Actor::new("erin"), &ctx).unwrap().request;

        for step in steps {
            let before = request.clone();
            let result = match step {
                0 => workflow.approve(&request, &approver_for(&request), ApprovalIntent::Advance, &ctx),
                1 => workflow.approve(&request, &approver_for(&request), ApprovalIntent::Final, &ctx),
                2 => workflow.reject(&request, &approver_for(&request), &ctx),
                3 => workflow.reopen(&request, &manager, &ctx),
                _ => workflow.approve(&request, &Actor::new("mallory"), ApprovalIntent::Advance, &ctx),
            };
            match result {
                Ok(transition) => request = transition.request,
                Err(_) => prop_assert_eq!(&request, &before),
            }
            prop_assert_eq!(
                request.current_level == 0,
                request.status != RequestStatus::PendingReview
            );
        }
    }
}
