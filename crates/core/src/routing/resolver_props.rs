//! Property-based tests for ApprovalRouteResolver.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::routing::resolver::ApprovalRouteResolver;
use crate::routing::types::{ApprovalLine, ApprovalSetting, LevelApprover, LineLevel};

/// Strategy for generating random positive amounts with two decimals.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..500_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// A contiguous three-bracket setting for one account plus a default line.
fn setting() -> ApprovalSetting {
    ApprovalSetting::new("CC-OPS Approvals", "CC-OPS")
        .with_line(
            ApprovalLine::for_account("A", Decimal::ZERO, Some(Decimal::new(1000, 0)))
                .level(1, LineLevel::new(LevelApprover::user("alice"))),
        )
        .with_line(
            ApprovalLine::for_account("A", Decimal::new(1000, 0), Some(Decimal::new(2000, 0)))
                .level(1, LineLevel::new(LevelApprover::user("bob")))
                .level(2, LineLevel::new(LevelApprover::user("carol"))),
        )
        .with_line(
            ApprovalLine::for_account("A", Decimal::new(2000, 0), None)
                .level(1, LineLevel::new(LevelApprover::user("bob")))
                .level(2, LineLevel::new(LevelApprover::user("carol")))
                .level(3, LineLevel::new(LevelApprover::role("CFO"))),
        )
        .with_line(
            ApprovalLine::default_line(Decimal::ZERO, None)
                .level(1, LineLevel::new(LevelApprover::role("Department Head"))),
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Resolving twice with unchanged configuration yields identical routes.
    #[test]
    fn prop_route_determinism(amount in arb_amount()) {
        let accounts: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        let setting = setting();
        let first = ApprovalRouteResolver::resolve_with_setting(&setting, &accounts, amount);
        let second = ApprovalRouteResolver::resolve_with_setting(&setting, &accounts, amount);
        prop_assert_eq!(first.unwrap(), second.unwrap());
    }

    /// Contiguous brackets from zero always produce a non-empty route.
    #[test]
    fn prop_contiguous_brackets_always_route(amount in arb_amount()) {
        let accounts: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        let route = ApprovalRouteResolver::resolve_with_setting(&setting(), &accounts, amount)
            .unwrap();
        prop_assert!(!route.is_empty());
        prop_assert_eq!(route.first_level(), Some(1));
    }

    /// Line order in the setting never changes the outcome.
    #[test]
    fn prop_line_order_irrelevant(amount in arb_amount()) {
        let accounts: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        let forward = setting();
        let mut reversed = forward.clone();
        reversed.lines.reverse();
        prop_assert_eq!(
            ApprovalRouteResolver::resolve_with_setting(&forward, &accounts, amount).unwrap(),
            ApprovalRouteResolver::resolve_with_setting(&reversed, &accounts, amount).unwrap()
        );
    }

    /// Unknown accounts always fall back to the default line.
    #[test]
    fn prop_unknown_account_uses_default(amount in arb_amount()) {
        let accounts: BTreeSet<String> = ["Z".to_string()].into_iter().collect();
        let route = ApprovalRouteResolver::resolve_with_setting(&setting(), &accounts, amount)
            .unwrap();
        prop_assert_eq!(route.level(1), Some(&LevelApprover::role("Department Head")));
    }
}
