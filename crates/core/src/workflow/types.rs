//! Workflow domain types for the spend request lifecycle.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spendline_shared::types::AuditId;

use super::request::SpendRequest;

/// Spend request status.
///
/// The valid transitions are:
/// - Draft → PendingReview | Approved (submit)
/// - PendingReview → PendingReview | Approved (approve)
/// - PendingReview → Rejected (reject)
/// - Approved | Rejected | Linked | Paid → PendingReview | Approved (reopen)
/// - Approved → Linked | Paid (link)
/// - Approved | Linked | Paid → Closed (close)
/// - Draft | PendingReview | Approved | Rejected → Cancelled (cancel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Being drafted; editable by its creator.
    Draft,
    /// Waiting on the approver at the current level.
    #[serde(rename = "Pending Review")]
    PendingReview,
    /// Fully approved.
    Approved,
    /// Rejected by an approver.
    Rejected,
    /// Linked to a downstream document.
    Linked,
    /// Linked to a payment.
    Paid,
    /// Closed after downstream processing.
    Closed,
    /// Cancelled before completion.
    Cancelled,
}

impl RequestStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PendingReview => "Pending Review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Linked => "Linked",
            Self::Paid => "Paid",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parses a status, ignoring case and spacing.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "draft" => Some(Self::Draft),
            "pendingreview" | "pending" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "linked" => Some(Self::Linked),
            "paid" => Some(Self::Paid),
            "closed" => Some(Self::Closed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if key-field edits are refused in this status.
    #[must_use]
    pub fn is_financially_final(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Linked | Self::Paid | Self::Closed | Self::Cancelled
        )
    }

    /// Returns true if the request can still be cancelled.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::PendingReview | Self::Approved | Self::Rejected
        )
    }

    /// Returns true if the request can be reopened.
    #[must_use]
    pub fn is_reopenable(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Linked | Self::Paid
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Budget lock status recorded on a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BudgetLockStatus {
    /// No reservation has been posted.
    #[default]
    #[serde(rename = "Not Locked")]
    NotLocked,
    /// Reservations are outstanding.
    Locked,
    /// Reservations were posted beyond the available budget.
    #[serde(rename = "Overrun Allowed")]
    OverrunAllowed,
    /// Reservations were consumed by an invoice.
    Consumed,
    /// Reservations were released.
    Released,
}

impl BudgetLockStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLocked => "Not Locked",
            Self::Locked => "Locked",
            Self::OverrunAllowed => "Overrun Allowed",
            Self::Consumed => "Consumed",
            Self::Released => "Released",
        }
    }
}

impl fmt::Display for BudgetLockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The identity acting on a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id.
    pub id: String,
    /// Roles held by the user.
    pub roles: BTreeSet<String>,
}

impl Actor {
    /// Creates an actor without roles.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            roles: BTreeSet::new(),
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.insert(role.to_string());
        self
    }

    /// Returns true if the actor holds the role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if the actor holds any of the roles.
    #[must_use]
    pub fn has_any_role(&self, roles: &[String]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

/// Explicit inputs that modify how a transition is evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionContext {
    /// Free-text reason recorded with the transition.
    pub reason: Option<String>,
    /// Who authorized an override, when one is used.
    pub authorized_by: Option<String>,
    /// Proceed with a reopen even though downstream documents are active.
    pub override_downstream: bool,
}

impl TransitionContext {
    /// Context with a reason.
    #[must_use]
    pub fn with_reason(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Context authorizing a reopen past active downstream documents.
    #[must_use]
    pub fn downstream_override(authorized_by: &str, reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            authorized_by: Some(authorized_by.to_string()),
            override_downstream: true,
        }
    }
}

/// How far an approver intends to move the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalIntent {
    /// Approve the current level and hand over to the next one.
    Advance,
    /// Approve straight to Approved.
    Final,
}

/// Severity of a notice returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Needs attention but did not block.
    Warning,
}

/// A message surfaced to the caller alongside a successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Human-readable message.
    pub message: String,
}

impl Notice {
    /// Informational notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Warning notice.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

/// Kind of audit record kept on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditKind {
    /// Submitted or re-resolved with an empty route.
    AutoApproved,
    /// Route resolution failed and was treated as no route.
    RouteDegraded,
    /// Reopened while downstream documents were active.
    ReopenOverride,
    /// Reservations posted beyond available budget.
    OverrunAllowed,
    /// Reopened.
    Reopened,
    /// Cancelled.
    Cancelled,
}

/// An audit trail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record id.
    pub id: AuditId,
    /// What happened.
    pub kind: AuditKind,
    /// Acting identity, if any.
    pub actor: Option<String>,
    /// Description.
    pub message: String,
    /// Supporting details, e.g. still-active downstream references.
    pub details: Vec<String>,
    /// When it happened.
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    /// Creates a record stamped now.
    #[must_use]
    pub fn new(kind: AuditKind, actor: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            id: AuditId::new(),
            kind,
            actor: actor.map(str::to_string),
            message: message.into(),
            details: Vec::new(),
            at: Utc::now(),
        }
    }

    /// Attaches details.
    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

/// The workflow operation that produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Submitted by the creator.
    Submit,
    /// Approved at a level.
    Approve,
    /// Rejected at a level.
    Reject,
    /// Reopened from a decided state.
    Reopen,
    /// Cancelled.
    Cancel,
    /// Key fields edited.
    Edit,
    /// Downstream document linked.
    Link,
    /// Downstream document link cancelled.
    CancelLink,
    /// Closed.
    Close,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Reopen => "reopen",
            Self::Cancel => "cancel",
            Self::Edit => "edit",
            Self::Link => "link",
            Self::CancelLink => "cancel link",
            Self::Close => "close",
        };
        write!(f, "{name}")
    }
}

/// Result of a workflow operation.
///
/// The input request is never mutated; `request` is the updated copy the
/// caller persists once the transition's side effects have succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The operation performed.
    pub kind: TransitionKind,
    /// Status before the operation.
    pub from: RequestStatus,
    /// Status after the operation.
    pub to: RequestStatus,
    /// The updated request.
    pub request: SpendRequest,
    /// Messages for the caller.
    pub notices: Vec<Notice>,
}
