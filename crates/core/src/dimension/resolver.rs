//! Dimension resolution from partial input and global configuration.

use std::collections::HashMap;
use std::sync::Arc;

use spendline_shared::ControlSettings;

use super::types::{DimensionInput, ResolvedDimensions};

/// Read-only lookups the resolver needs from the host.
pub trait DimensionLookup: Send + Sync {
    /// Returns the company that owns a cost center.
    fn company_for_cost_center(&self, cost_center: &str) -> Option<String>;

    /// Returns a user's default fiscal year.
    fn default_fiscal_year_for_user(&self, user: &str) -> Option<String>;
}

/// In-memory lookup tables.
#[derive(Debug, Clone, Default)]
pub struct StaticDimensionLookup {
    companies: HashMap<String, String>,
    fiscal_years: HashMap<String, String>,
}

impl StaticDimensionLookup {
    /// Creates an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the company owning a cost center.
    #[must_use]
    pub fn with_cost_center(mut self, cost_center: &str, company: &str) -> Self {
        self.companies
            .insert(cost_center.to_string(), company.to_string());
        self
    }

    /// Registers a user's default fiscal year.
    #[must_use]
    pub fn with_user_fiscal_year(mut self, user: &str, fiscal_year: &str) -> Self {
        self.fiscal_years
            .insert(user.to_string(), fiscal_year.to_string());
        self
    }
}

impl DimensionLookup for StaticDimensionLookup {
    fn company_for_cost_center(&self, cost_center: &str) -> Option<String> {
        self.companies.get(cost_center).cloned()
    }

    fn default_fiscal_year_for_user(&self, user: &str) -> Option<String> {
        self.fiscal_years.get(user).cloned()
    }
}

/// Resolves budget keys. Pure function over configuration and lookups.
#[derive(Clone)]
pub struct DimensionResolver {
    lookup: Arc<dyn DimensionLookup>,
}

impl DimensionResolver {
    /// Creates a resolver over the given lookups.
    #[must_use]
    pub fn new(lookup: Arc<dyn DimensionLookup>) -> Self {
        Self { lookup }
    }

    /// Resolves the budget key for a cost center.
    ///
    /// Company: explicit value, else the cost center's company, else the
    /// configured default. Fiscal year: explicit value, else the user's
    /// default, else the configured default. Project and branch are kept
    /// only when the dimension mode includes them. Never fails; callers
    /// decide whether a missing dimension matters.
    #[must_use]
    pub fn resolve(
        &self,
        input: &DimensionInput,
        cost_center: &str,
        settings: &ControlSettings,
    ) -> ResolvedDimensions {
        let company = non_empty(input.company.as_deref())
            .or_else(|| self.lookup.company_for_cost_center(cost_center))
            .or_else(|| settings.default_company.clone());

        let fiscal_year = non_empty(input.fiscal_year.as_deref())
            .or_else(|| {
                input
                    .user
                    .as_deref()
                    .and_then(|user| self.lookup.default_fiscal_year_for_user(user))
            })
            .or_else(|| settings.default_fiscal_year.clone());

        let mode = settings.dimension_mode;
        ResolvedDimensions {
            company,
            fiscal_year,
            cost_center: cost_center.to_string(),
            account: non_empty(input.account.as_deref()),
            project: if mode.includes_project() {
                non_empty(input.project.as_deref())
            } else {
                None
            },
            branch: if mode.includes_branch() {
                non_empty(input.branch.as_deref())
            } else {
                None
            },
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
