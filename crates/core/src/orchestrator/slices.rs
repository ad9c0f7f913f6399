//! Budget slices of a spend request.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spendline_shared::ControlSettings;
use spendline_shared::types::Amount;

use super::error::OrchestratorError;
use crate::dimension::{DimensionInput, DimensionResolver, Dimensions};
use crate::workflow::SpendRequest;

/// The part of a request's amount charged to one budget key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSlice {
    /// Budget key.
    pub dimensions: Dimensions,
    /// Amount charged to the key.
    pub amount: Decimal,
}

/// Computes budget slices from request line items.
pub struct BudgetSlices;

impl BudgetSlices {
    /// Returns one slice per resolved budget key, ordered by key.
    ///
    /// Lines are grouped per (cost center, account). With internal charge
    /// enabled and an allocation attached, each group is redistributed
    /// across the target cost centers in proportion to their shares.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Dimension` when a key cannot be fully resolved.
    pub fn for_request(
        request: &SpendRequest,
        resolver: &DimensionResolver,
        settings: &ControlSettings,
    ) -> Result<Vec<BudgetSlice>, OrchestratorError> {
        let groups = Self::redistribute(request, Self::group_items(request), settings);

        let mut slices: BTreeMap<Dimensions, Decimal> = BTreeMap::new();
        for ((cost_center, account), amount) in groups {
            let input = DimensionInput {
                company: request.company.clone(),
                fiscal_year: request.fiscal_year.clone(),
                account: Some(account),
                project: request.project.clone(),
                branch: request.branch.clone(),
                user: Some(request.owner.clone()),
            };
            let dims = resolver
                .resolve(&input, &cost_center, settings)
                .into_dimensions()?;
            *slices.entry(dims).or_default() += amount;
        }

        Ok(slices
            .into_iter()
            .map(|(dimensions, amount)| BudgetSlice {
                dimensions,
                amount: Amount::round(amount),
            })
            .filter(|slice| !Amount::is_negligible(slice.amount))
            .collect())
    }

    /// Sums valid line amounts per (cost center, account).
    #[must_use]
    pub fn group_items(request: &SpendRequest) -> BTreeMap<(String, String), Decimal> {
        let mut groups: BTreeMap<(String, String), Decimal> = BTreeMap::new();
        for item in request.items.iter().filter(|item| item.is_valid()) {
            let Some(account) = item.account() else {
                continue;
            };
            let cost_center = item
                .cost_center
                .clone()
                .unwrap_or_else(|| request.cost_center.clone());
            *groups.entry((cost_center, account.to_string())).or_default() += item.amount;
        }
        groups
    }

    fn redistribute(
        request: &SpendRequest,
        groups: BTreeMap<(String, String), Decimal>,
        settings: &ControlSettings,
    ) -> BTreeMap<(String, String), Decimal> {
        let Some(charge) = request
            .internal_charge
            .as_ref()
            .filter(|charge| settings.enable_internal_charge && charge.total() > Decimal::ZERO)
        else {
            return groups;
        };

        let weights: Vec<Decimal> = charge.lines.iter().map(|line| line.amount).collect();
        let mut redistributed: BTreeMap<(String, String), Decimal> = BTreeMap::new();
        for ((_, account), amount) in groups {
            let shares = Amount::pro_rata(amount, &weights);
            for (line, share) in charge.lines.iter().zip(shares) {
                *redistributed
                    .entry((line.cost_center.clone(), account.clone()))
                    .or_default() += share;
            }
        }
        redistributed
    }
}
