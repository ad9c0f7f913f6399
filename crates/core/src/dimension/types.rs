//! Dimension value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::DimensionError;

/// A fully resolved budget key.
///
/// Equality is structural; the ledger partitions entries by this value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    company: String,
    fiscal_year: String,
    cost_center: String,
    account: String,
    project: Option<String>,
    branch: Option<String>,
}

impl Dimensions {
    /// Creates a key from the four native dimensions.
    #[must_use]
    pub fn new(
        company: impl Into<String>,
        fiscal_year: impl Into<String>,
        cost_center: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            fiscal_year: fiscal_year.into(),
            cost_center: cost_center.into(),
            account: account.into(),
            project: None,
            branch: None,
        }
    }

    /// Returns a copy of this key scoped to a project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Returns a copy of this key scoped to a branch.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Returns a copy of this key for another cost center and account.
    #[must_use]
    pub fn rekeyed(&self, cost_center: &str, account: &str) -> Self {
        Self {
            cost_center: cost_center.to_string(),
            account: account.to_string(),
            ..self.clone()
        }
    }

    /// Company.
    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    /// Fiscal year.
    #[must_use]
    pub fn fiscal_year(&self) -> &str {
        &self.fiscal_year
    }

    /// Cost center.
    #[must_use]
    pub fn cost_center(&self) -> &str {
        &self.cost_center
    }

    /// Expense account.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Project, when the dimension mode includes it.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Branch, when the dimension mode includes it.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.company, self.fiscal_year, self.cost_center, self.account
        )?;
        if let Some(project) = &self.project {
            write!(f, "/project:{project}")?;
        }
        if let Some(branch) = &self.branch {
            write!(f, "/branch:{branch}")?;
        }
        Ok(())
    }
}

/// Explicit values supplied by the caller; anything absent is looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionInput {
    /// Company override.
    pub company: Option<String>,
    /// Fiscal year override.
    pub fiscal_year: Option<String>,
    /// Expense account.
    pub account: Option<String>,
    /// Project.
    pub project: Option<String>,
    /// Branch.
    pub branch: Option<String>,
    /// User whose default fiscal year applies when none is given.
    pub user: Option<String>,
}

/// Result of dimension resolution; may be partially populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDimensions {
    /// Company.
    pub company: Option<String>,
    /// Fiscal year.
    pub fiscal_year: Option<String>,
    /// Cost center.
    pub cost_center: String,
    /// Expense account.
    pub account: Option<String>,
    /// Project (only when the mode allows it).
    pub project: Option<String>,
    /// Branch (only when the mode allows it).
    pub branch: Option<String>,
}

impl ResolvedDimensions {
    /// Returns true if every dimension required by the ledger is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.company.is_some()
            && self.fiscal_year.is_some()
            && self.account.is_some()
            && !self.cost_center.is_empty()
    }

    /// Converts into a full ledger key.
    ///
    /// # Errors
    ///
    /// Returns `DimensionError::Missing` naming the first absent dimension.
    pub fn into_dimensions(self) -> Result<Dimensions, DimensionError> {
        let missing = |field| DimensionError::Missing {
            field,
            cost_center: self.cost_center.clone(),
        };

        if self.cost_center.is_empty() {
            return Err(missing("cost_center"));
        }
        let company = self.company.clone().ok_or_else(|| missing("company"))?;
        let fiscal_year = self.fiscal_year.clone().ok_or_else(|| missing("fiscal_year"))?;
        let account = self.account.clone().ok_or_else(|| missing("account"))?;

        let mut dims = Dimensions::new(company, fiscal_year, self.cost_center, account);
        if let Some(project) = self.project {
            dims = dims.with_project(project);
        }
        if let Some(branch) = self.branch {
            dims = dims.with_branch(branch);
        }
        Ok(dims)
    }
}
