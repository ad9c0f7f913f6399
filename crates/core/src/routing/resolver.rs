//! Approval route resolution.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use super::error::RoutingError;
use super::types::{ApprovalLine, ApprovalRoute, ApprovalSetting, RouteResolution};
use crate::settings::SettingsProvider;

/// Resolves approval routes from the active setting of a cost center.
#[derive(Clone)]
pub struct ApprovalRouteResolver {
    settings: Arc<dyn SettingsProvider>,
}

impl ApprovalRouteResolver {
    /// Creates a resolver backed by a settings provider.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self { settings }
    }

    /// Resolves the route for a request.
    ///
    /// Returns `RouteResolution::ConfigMissing` when the cost center has no
    /// active setting. A setting whose lines match none of the accounts
    /// yields an empty route, which callers treat as auto-approve.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::RouteInconsistent` when two accounts resolve
    /// to different non-empty routes, or a settings error if the provider fails.
    pub fn resolve(
        &self,
        cost_center: &str,
        accounts: &BTreeSet<String>,
        amount: Decimal,
    ) -> Result<RouteResolution, RoutingError> {
        let Some(setting) = self.settings.active_approval_setting(cost_center)? else {
            debug!(cost_center, "no active approval setting");
            return Ok(RouteResolution::ConfigMissing {
                cost_center: cost_center.to_string(),
            });
        };

        let route = Self::resolve_with_setting(&setting, accounts, amount)?;
        debug!(
            cost_center,
            setting = %setting.name,
            %amount,
            empty = route.is_empty(),
            "approval route resolved"
        );
        Ok(RouteResolution::Route {
            route,
            setting: setting.stamp(),
        })
    }

    /// Resolves a route against a given setting.
    ///
    /// Each account is matched independently: an exact account line whose
    /// bracket contains the amount, else a default line, else nothing.
    /// An empty account set consults the default lines only.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::RouteInconsistent` when two accounts resolve
    /// to different non-empty routes.
    pub fn resolve_with_setting(
        setting: &ApprovalSetting,
        accounts: &BTreeSet<String>,
        amount: Decimal,
    ) -> Result<ApprovalRoute, RoutingError> {
        if accounts.is_empty() {
            return Ok(Self::best_line(setting, None, amount)
                .map(|line| line.route_for(amount))
                .unwrap_or_default());
        }

        let mut resolved: Option<(&str, ApprovalRoute)> = None;
        for account in accounts {
            let route = Self::best_line(setting, Some(account), amount)
                .map(|line| line.route_for(amount))
                .unwrap_or_default();
            if route.is_empty() {
                continue;
            }

            match &resolved {
                None => resolved = Some((account.as_str(), route)),
                Some((first_account, first_route)) if *first_route != route => {
                    return Err(RoutingError::RouteInconsistent {
                        cost_center: setting.cost_center.clone(),
                        first_account: (*first_account).to_string(),
                        second_account: account.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(resolved.map(|(_, route)| route).unwrap_or_default())
    }

    /// Finds the most specific line for an account, falling back to default lines.
    fn best_line<'a>(
        setting: &'a ApprovalSetting,
        account: Option<&str>,
        amount: Decimal,
    ) -> Option<&'a ApprovalLine> {
        let exact = account.and_then(|account| {
            Self::most_specific(
                setting
                    .lines
                    .iter()
                    .filter(|line| !line.is_default && line.account.as_deref() == Some(account))
                    .filter(|line| line.contains(amount)),
            )
        });

        exact.or_else(|| {
            Self::most_specific(
                setting
                    .lines
                    .iter()
                    .filter(|line| line.is_default)
                    .filter(|line| line.contains(amount)),
            )
        })
    }

    /// Picks the highest-floor, narrowest bracket.
    fn most_specific<'a>(
        lines: impl Iterator<Item = &'a ApprovalLine>,
    ) -> Option<&'a ApprovalLine> {
        lines.min_by(|a, b| Self::specificity(a, b))
    }

    /// Orders by min descending, then max ascending (unbounded last).
    fn specificity(a: &ApprovalLine, b: &ApprovalLine) -> Ordering {
        b.min_amount
            .cmp(&a.min_amount)
            .then_with(|| match (a.max_amount, b.max_amount) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}
