//! Workflow error types for the spend request lifecycle.
//!
//! Every variant is raised before the request copy is returned, so a
//! failed transition never carries partial state.

use thiserror::Error;

use crate::routing::RoutingError;
use crate::settings::SettingsError;
use crate::workflow::types::{RequestStatus, TransitionKind};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The operation is not allowed from the current status.
    #[error("Cannot {action} a request in status {from}")]
    InvalidTransition {
        /// The current status.
        from: RequestStatus,
        /// The attempted operation.
        action: TransitionKind,
    },

    /// Only the creator may submit.
    #[error("Only the creator {owner} may submit this request, not {actor}")]
    NotCreator {
        /// The acting user.
        actor: String,
        /// The request creator.
        owner: String,
    },

    /// The actor is not the routed approver for the current level.
    #[error("User {actor} is not the routed approver for level {level}")]
    NotRoutedApprover {
        /// The acting user.
        actor: String,
        /// The current level.
        level: u8,
    },

    /// The actor lacks a role the operation requires.
    #[error("User {actor} lacks a role permitted to {action} this request")]
    MissingRole {
        /// The acting user.
        actor: String,
        /// The attempted operation.
        action: TransitionKind,
    },

    /// Approving straight to Approved would skip a configured level.
    #[error("Cannot approve level {level} as final: level {pending} is still pending")]
    SkipLevel {
        /// The level being approved.
        level: u8,
        /// The next configured level.
        pending: u8,
    },

    /// The route snapshot is older than the approval setting.
    #[error("Approval route for {reference} is outdated; refresh required")]
    RouteStale {
        /// The request name.
        reference: String,
    },

    /// Downstream documents are still active.
    #[error("Active downstream documents block this operation: {}", .links.join(", "))]
    DownstreamActive {
        /// Active downstream references.
        links: Vec<String>,
    },

    /// Key fields cannot change once the request is approved.
    #[error("Key fields of a request in status {status} cannot be changed")]
    KeyFieldsLocked {
        /// The current status.
        status: RequestStatus,
    },

    /// A line item is invalid.
    #[error("Line item {index} is invalid: {reason}")]
    InvalidItem {
        /// Zero-based item index.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// The request has nothing to approve.
    #[error("Request amount must be positive")]
    EmptyRequest,

    /// No downstream link with that reference exists.
    #[error("Downstream link {0} not found")]
    LinkNotFound(String),

    /// Route resolution failed.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The settings provider failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidItem { .. } | Self::EmptyRequest | Self::SkipLevel { .. } => 400,

            Self::NotCreator { .. } | Self::NotRoutedApprover { .. } | Self::MissingRole { .. } => {
                403
            }

            Self::LinkNotFound(_) => 404,

            Self::InvalidTransition { .. }
            | Self::RouteStale { .. }
            | Self::DownstreamActive { .. }
            | Self::KeyFieldsLocked { .. } => 409,

            Self::Routing(RoutingError::RouteInconsistent { .. }) => 422,

            Self::Routing(_) | Self::Settings(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotCreator { .. } => "NOT_CREATOR",
            Self::NotRoutedApprover { .. } => "NOT_ROUTED_APPROVER",
            Self::MissingRole { .. } => "MISSING_ROLE",
            Self::SkipLevel { .. } => "SKIP_LEVEL",
            Self::RouteStale { .. } => "ROUTE_STALE",
            Self::DownstreamActive { .. } => "DOWNSTREAM_ACTIVE",
            Self::KeyFieldsLocked { .. } => "KEY_FIELDS_LOCKED",
            Self::InvalidItem { .. } => "INVALID_ITEM",
            Self::EmptyRequest => "EMPTY_REQUEST",
            Self::LinkNotFound(_) => "LINK_NOT_FOUND",
            Self::Routing(err) => err.error_code(),
            Self::Settings(err) => err.error_code(),
        }
    }

    /// Returns true if the error is an authorization failure.
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotCreator { .. } | Self::NotRoutedApprover { .. } | Self::MissingRole { .. }
        )
    }
}
