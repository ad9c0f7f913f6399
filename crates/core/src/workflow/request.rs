//! The spend request and its line items.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::summary::summarize_items;
use super::types::{AuditRecord, BudgetLockStatus, RequestStatus};
use crate::ledger::DocRef;
use crate::routing::RouteSnapshot;

/// Doctype used when referencing spend requests in the ledger.
pub const REQUEST_DOCTYPE: &str = "Expense Request";

/// One expense line of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Expense account; blank counts as missing.
    pub account: String,
    /// Line amount.
    pub amount: Decimal,
    /// Cost center override for this line.
    pub cost_center: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

impl LineItem {
    /// Creates a line.
    #[must_use]
    pub fn new(account: &str, amount: Decimal) -> Self {
        Self {
            account: account.to_string(),
            amount,
            cost_center: None,
            description: None,
        }
    }

    /// Charges this line to another cost center.
    #[must_use]
    pub fn with_cost_center(mut self, cost_center: &str) -> Self {
        self.cost_center = Some(cost_center.to_string());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Returns the account, or `None` if blank.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        let account = self.account.trim();
        (!account.is_empty()).then_some(account)
    }

    /// Returns true if the line can be budgeted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.account().is_some() && self.amount > Decimal::ZERO
    }
}

/// Kind of downstream document linked to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// Payment entry.
    Payment,
    /// Purchase invoice.
    PurchaseInvoice,
    /// Asset.
    Asset,
}

impl LinkKind {
    /// Returns the doctype name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "Payment Entry",
            Self::PurchaseInvoice => "Purchase Invoice",
            Self::Asset => "Asset",
        }
    }
}

/// A downstream document created from a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownstreamLink {
    /// Document kind.
    pub kind: LinkKind,
    /// Document reference.
    pub reference: DocRef,
    /// Whether the document has been cancelled.
    pub cancelled: bool,
}

impl DownstreamLink {
    /// Creates an active link.
    #[must_use]
    pub fn new(kind: LinkKind, name: &str) -> Self {
        Self {
            kind,
            reference: DocRef::new(kind.as_str(), name),
            cancelled: false,
        }
    }

    /// Returns true if the document is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }
}

/// Target cost center of an internal charge allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalChargeLine {
    /// Target cost center.
    pub cost_center: String,
    /// Allocated share, as an amount.
    pub amount: Decimal,
}

/// Redistribution of a request's cost across target cost centers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalCharge {
    /// Allocation lines.
    pub lines: Vec<InternalChargeLine>,
}

impl InternalCharge {
    /// Adds a target cost center.
    #[must_use]
    pub fn with_line(mut self, cost_center: &str, amount: Decimal) -> Self {
        self.lines.push(InternalChargeLine {
            cost_center: cost_center.to_string(),
            amount,
        });
        self
    }

    /// Sum of the line amounts.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount).sum()
    }
}

/// A spend request: the workflow subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRequest {
    /// Document reference.
    pub reference: DocRef,
    /// Creator.
    pub owner: String,
    /// Company override.
    pub company: Option<String>,
    /// Fiscal year override.
    pub fiscal_year: Option<String>,
    /// Cost center.
    pub cost_center: String,
    /// Branch.
    pub branch: Option<String>,
    /// Project.
    pub project: Option<String>,
    /// Expense lines.
    pub items: Vec<LineItem>,
    /// Total of valid lines.
    pub amount: Decimal,
    /// Sorted, deduplicated expense accounts.
    pub expense_accounts: BTreeSet<String>,
    /// Workflow status.
    pub status: RequestStatus,
    /// Current approval level; 0 unless pending review.
    pub current_level: u8,
    /// Route the request is gated by.
    pub route_snapshot: Option<RouteSnapshot>,
    /// Who approved each level.
    pub level_users: [Option<String>; 3],
    /// When the request was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// When the request was rejected.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Budget lock status.
    pub budget_lock_status: BudgetLockStatus,
    /// Downstream documents.
    pub downstream_links: Vec<DownstreamLink>,
    /// Internal charge allocation, if attached.
    pub internal_charge: Option<InternalCharge>,
    /// Audit trail.
    pub audit: Vec<AuditRecord>,
}

impl SpendRequest {
    /// Creates a draft request with no lines.
    #[must_use]
    pub fn draft(name: &str, owner: &str, cost_center: &str) -> Self {
        Self {
            reference: DocRef::new(REQUEST_DOCTYPE, name),
            owner: owner.to_string(),
            company: None,
            fiscal_year: None,
            cost_center: cost_center.to_string(),
            branch: None,
            project: None,
            items: Vec::new(),
            amount: Decimal::ZERO,
            expense_accounts: BTreeSet::new(),
            status: RequestStatus::Draft,
            current_level: 0,
            route_snapshot: None,
            level_users: [None, None, None],
            approved_at: None,
            rejected_at: None,
            budget_lock_status: BudgetLockStatus::NotLocked,
            downstream_links: Vec::new(),
            internal_charge: None,
            audit: Vec::new(),
        }
    }

    /// Adds a line and refreshes totals, skipping invalid lines.
    #[must_use]
    pub fn with_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self.refresh_totals_lenient();
        self
    }

    /// Sets the company.
    #[must_use]
    pub fn with_company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    /// Sets the fiscal year.
    #[must_use]
    pub fn with_fiscal_year(mut self, fiscal_year: &str) -> Self {
        self.fiscal_year = Some(fiscal_year.to_string());
        self
    }

    /// Sets the branch.
    #[must_use]
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// Sets the project.
    #[must_use]
    pub fn with_project(mut self, project: &str) -> Self {
        self.project = Some(project.to_string());
        self
    }

    /// Attaches an internal charge allocation.
    #[must_use]
    pub fn with_internal_charge(mut self, charge: InternalCharge) -> Self {
        self.internal_charge = Some(charge);
        self
    }

    /// Recomputes `amount` and `expense_accounts` from the lines.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidItem` when a line is invalid and
    /// `skip_invalid` is false.
    pub fn refresh_totals(&mut self, skip_invalid: bool) -> Result<(), WorkflowError> {
        let summary = summarize_items(&self.items, skip_invalid)?;
        self.amount = summary.total;
        self.expense_accounts = summary.accounts;
        Ok(())
    }

    fn refresh_totals_lenient(&mut self) {
        if let Ok(summary) = summarize_items(&self.items, true) {
            self.amount = summary.total;
            self.expense_accounts = summary.accounts;
        }
    }

    /// Returns true if the fields that determine the route differ.
    #[must_use]
    pub fn key_fields_differ(&self, other: &Self) -> bool {
        self.amount != other.amount
            || self.cost_center != other.cost_center
            || self.branch != other.branch
            || self.expense_accounts != other.expense_accounts
    }

    /// Returns the downstream documents that are still active.
    #[must_use]
    pub fn active_links(&self) -> Vec<&DownstreamLink> {
        self.downstream_links
            .iter()
            .filter(|link| link.is_active())
            .collect()
    }
}

/// Changes applied to a submitted request.
///
/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestEdit {
    /// Replacement lines.
    pub items: Option<Vec<LineItem>>,
    /// Replacement cost center.
    pub cost_center: Option<String>,
    /// Replacement branch; `Some(None)` clears it.
    pub branch: Option<Option<String>>,
    /// Replacement project; `Some(None)` clears it.
    pub project: Option<Option<String>>,
}

impl RequestEdit {
    /// Applies the edit to a copy of `request` and refreshes totals.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidItem` for an invalid replacement line.
    pub fn apply_to(&self, request: &SpendRequest) -> Result<SpendRequest, WorkflowError> {
        let mut edited = request.clone();
        if let Some(items) = &self.items {
            edited.items.clone_from(items);
        }
        if let Some(cost_center) = &self.cost_center {
            edited.cost_center.clone_from(cost_center);
        }
        if let Some(branch) = &self.branch {
            edited.branch.clone_from(branch);
        }
        if let Some(project) = &self.project {
            edited.project.clone_from(project);
        }
        edited.refresh_totals(false)?;
        Ok(edited)
    }
}
