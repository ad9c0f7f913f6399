//! Property-based tests for BudgetOrchestrator.
//!
//! - Idempotence: repeated invoice submits leave exactly one CONSUMPTION
//! - Conservation: a request's contribution never goes negative and
//!   matches its outstanding reservations under any event order

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use spendline_shared::ControlSettings;

use super::service::BudgetOrchestrator;
use crate::allocation::InMemoryAllocations;
use crate::dimension::{DimensionResolver, Dimensions, StaticDimensionLookup};
use crate::ledger::{BudgetLedger, DocRef, EntryType, InMemoryLedgerStore};
use crate::settings::StaticSettings;
use crate::workflow::{
    Actor, LineItem, RequestStatus, SpendRequest, Transition, TransitionKind,
};

/// Strategy to generate positive decimal amounts (0.01 to 1,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for events: 0 lock, 1 release, 2 invoice submit, 3 invoice cancel.
fn arb_events() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..4, 0u8..2), 1..25)
}

fn orchestrator() -> BudgetOrchestrator {
    let settings = Arc::new(StaticSettings::new(ControlSettings::default()));
    let allocations = Arc::new(InMemoryAllocations::new());
    for account in ["5110", "5120"] {
        allocations.set_allocation(
            Dimensions::new("ACME", "2026", "CC-OPS", account),
            Decimal::new(10_000_000, 2),
        );
    }
    let ledger = Arc::new(BudgetLedger::new(
        Arc::new(InMemoryLedgerStore::new()),
        allocations,
        settings,
    ));
    let dimensions = DimensionResolver::new(Arc::new(
        StaticDimensionLookup::new()
            .with_cost_center("CC-OPS", "ACME")
            .with_user_fiscal_year("erin", "2026"),
    ));
    BudgetOrchestrator::new(ledger, dimensions)
}

fn request(first: Decimal, second: Decimal) -> SpendRequest {
    let mut request = SpendRequest::draft("ER-PROP", "erin", "CC-OPS")
        .with_item(LineItem::new("5110", first))
        .with_item(LineItem::new("5120", second));
    request.status = RequestStatus::Approved;
    request
}

fn transition(request: &SpendRequest, kind: TransitionKind, to: RequestStatus) -> Transition {
    Transition {
        kind,
        from: request.status,
        to,
        request: request.clone(),
        notices: Vec::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_invoice_submit_is_idempotent(
        first in positive_amount(),
        second in positive_amount(),
        repeats in 1usize..5,
    ) {
        let orchestrator = orchestrator();
        let actor = Actor::new("erin");
        let mut t = transition(&request(first, second), TransitionKind::Approve, RequestStatus::Approved);
        orchestrator.on_transition(&mut t, &actor).unwrap();

        let invoice = DocRef::new("Purchase Invoice", "PI-PROP");
        let mut request = t.request;
        for _ in 0..repeats {
            orchestrator.on_invoice_submitted(&mut request, &invoice, &actor).unwrap();
        }

        let consumptions = orchestrator
            .ledger()
            .entries_for_reference(&invoice)
            .unwrap()
            .into_iter()
            .filter(|e| e.entry_type == EntryType::Consumption)
            .count();
        // One consumption per slice, however often the invoice is submitted.
        prop_assert_eq!(consumptions, 2);
    }

    #[test]
    fn prop_conservation_under_any_event_order(
        first in positive_amount(),
        second in positive_amount(),
        events in arb_events(),
    ) {
        let orchestrator = orchestrator();
        let actor = Actor::new("erin");
        let mut request = request(first, second);

        for (event, invoice_no) in events {
            let invoice = DocRef::new("Purchase Invoice", &format!("PI-{invoice_no}"));
            match event {
                0 => {
                    let mut t = transition(&request, TransitionKind::Reopen, RequestStatus::Approved);
                    orchestrator.on_transition(&mut t, &actor).unwrap();
                    request = t.request;
                }
                1 => {
                    let mut t = transition(&request, TransitionKind::Reject, RequestStatus::Rejected);
                    orchestrator.on_transition(&mut t, &actor).unwrap();
                    request = t.request;
                }
                2 => {
                    orchestrator.on_invoice_submitted(&mut request, &invoice, &actor).unwrap();
                }
                _ => {
                    orchestrator.on_invoice_cancelled(&mut request, &invoice).unwrap();
                }
            }

            let ledger = orchestrator.ledger();
            let contribution = ledger.request_contribution(&request.reference).unwrap();
            prop_assert!(contribution >= Decimal::ZERO);
            prop_assert!(contribution <= first + second);

            let outstanding: Decimal = ledger
                .outstanding_for_request(&request.reference)
                .unwrap()
                .values()
                .copied()
                .sum();
            prop_assert_eq!(outstanding, contribution);
        }
    }
}
