//! Property-based tests for BudgetLedger.
//!
//! - Round-trip: reserve then release leaves availability unchanged
//! - Conservation: a request's contribution equals the signed sum of its entries
//! - Outstanding amounts sum to the request contribution

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::entry::{Direction, DocRef, EntryType, NewEntry};
use super::service::BudgetLedger;
use super::store::InMemoryLedgerStore;
use crate::allocation::InMemoryAllocations;
use crate::dimension::Dimensions;
use crate::settings::StaticSettings;
use spendline_shared::ControlSettings;

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to pick one of a few accounts.
fn account() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("5110".to_string()),
        Just("5120".to_string()),
        Just("5130".to_string()),
    ]
}

fn ledger(allocations: Arc<InMemoryAllocations>) -> BudgetLedger {
    BudgetLedger::new(
        Arc::new(InMemoryLedgerStore::new()),
        allocations,
        Arc::new(StaticSettings::new(ControlSettings::default())),
    )
}

fn dims(account: &str) -> Dimensions {
    Dimensions::new("ACME", "2026", "CC-OPS", account)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_reserve_release_round_trip(
        allocated in positive_amount(),
        amount in positive_amount(),
    ) {
        let allocations = Arc::new(InMemoryAllocations::new());
        allocations.set_allocation(dims("5110"), allocated);
        let ledger = ledger(allocations);
        let request = DocRef::new("Expense Request", "ER-RT");

        let before = ledger.get_availability(&dims("5110"), None).unwrap().available;
        ledger
            .post_entry(
                NewEntry::new(EntryType::Reservation, dims("5110"), amount, Direction::Out, request.clone())
                    .for_request(&request),
            )
            .unwrap();
        ledger
            .post_entry(
                NewEntry::new(EntryType::Release, dims("5110"), amount, Direction::In, request.clone())
                    .for_request(&request),
            )
            .unwrap();
        let after = ledger.get_availability(&dims("5110"), None).unwrap().available;

        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_conservation_per_request(
        postings in prop::collection::vec((account(), positive_amount(), 0u8..4), 1..20),
    ) {
        let ledger = ledger(Arc::new(InMemoryAllocations::new()));
        let request = DocRef::new("Expense Request", "ER-CONS");
        let invoice = DocRef::new("Purchase Invoice", "PI-CONS");
        let mut expected = Decimal::ZERO;

        for (account, amount, kind) in postings {
            let (entry_type, direction, reference, sign) = match kind {
                0 => (EntryType::Reservation, Direction::Out, request.clone(), Decimal::ONE),
                1 => (EntryType::Consumption, Direction::In, invoice.clone(), Decimal::NEGATIVE_ONE),
                2 => (EntryType::Reversal, Direction::Out, invoice.clone(), Decimal::ONE),
                _ => (EntryType::Release, Direction::In, request.clone(), Decimal::NEGATIVE_ONE),
            };
            expected += sign * amount;
            ledger
                .post_entry(
                    NewEntry::new(entry_type, dims(&account), amount, direction, reference)
                        .for_request(&request),
                )
                .unwrap();
        }

        let contribution = ledger.request_contribution(&request).unwrap();
        prop_assert_eq!(contribution, expected);

        let outstanding: Decimal = ledger
            .outstanding_for_request(&request)
            .unwrap()
            .values()
            .copied()
            .sum();
        prop_assert!((outstanding - contribution).abs() < Decimal::new(1, 2));
    }

    #[test]
    fn prop_reclass_and_supplement_never_reserve(
        amount in positive_amount(),
    ) {
        let settings = ControlSettings {
            enable_budget_reclass: true,
            enable_additional_budget: true,
            ..ControlSettings::default()
        };
        let ledger = BudgetLedger::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryAllocations::new()),
            Arc::new(StaticSettings::new(settings)),
        );
        let reference = DocRef::new("Budget Reclass", "BR-1");

        ledger
            .post_batch(vec![
                NewEntry::new(EntryType::Reclass, dims("5110"), amount, Direction::Out, reference.clone()),
                NewEntry::new(EntryType::Reclass, dims("5120"), amount, Direction::In, reference.clone()),
                NewEntry::new(EntryType::Supplement, dims("5130"), amount, Direction::In, reference),
            ])
            .unwrap();

        for account in ["5110", "5120", "5130"] {
            let snapshot = ledger.get_availability(&dims(account), None).unwrap();
            prop_assert_eq!(snapshot.reserved, Decimal::ZERO);
        }
    }
}
