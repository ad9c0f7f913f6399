//! Line-item summarization.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::request::LineItem;

/// Total amount and the distinct expense accounts of a set of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Sum of valid item amounts.
    pub total: Decimal,
    /// Sorted, deduplicated expense accounts.
    pub accounts: BTreeSet<String>,
}

/// Summarizes line items.
///
/// An item is invalid when its amount is not positive or its account is
/// missing. Invalid items are skipped when `skip_invalid` is set.
///
/// # Errors
///
/// Returns `WorkflowError::InvalidItem` for the first invalid item when
/// `skip_invalid` is false.
pub fn summarize_items(items: &[LineItem], skip_invalid: bool) -> Result<ItemSummary, WorkflowError> {
    let mut summary = ItemSummary::default();

    for (index, item) in items.iter().enumerate() {
        let account = item.account();
        let problem = match account {
            None => Some("missing expense account"),
            Some(_) if item.amount <= Decimal::ZERO => Some("amount must be positive"),
            Some(_) => None,
        };

        if let Some(reason) = problem {
            if skip_invalid {
                continue;
            }
            return Err(WorkflowError::InvalidItem {
                index,
                reason: reason.to_string(),
            });
        }

        summary.total += item.amount;
        if let Some(account) = account {
            summary.accounts.insert(account.to_string());
        }
    }

    Ok(summary)
}
