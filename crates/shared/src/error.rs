//! Application-wide error types.
//!
//! Every module error in the core converts into `AppError`, whose variants
//! follow the control plane's error taxonomy. Duplicate postings never
//! surface here: they are resolved idempotently by the caller.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// A configuration record an operator explicitly targeted does not exist.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The acting identity is not routed for this action.
    #[error("Access denied: {0}")]
    AuthorizationDenied(String),

    /// Accounts on one request resolved to conflicting approval routes.
    #[error("Approval route inconsistent: {0}")]
    RouteInconsistent(String),

    /// The approval route is older than its setting and must be refreshed.
    #[error("Approval route refresh required: {0}")]
    RouteStale(String),

    /// Requested amount exceeds the available budget.
    #[error("Insufficient budget: {0}")]
    InsufficientBudget(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict with the current state of a resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage adapter error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code a transport layer should use for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::AuthorizationDenied(_) => 403,
            Self::NotFound(_) | Self::ConfigurationMissing(_) => 404,
            Self::Validation(_) => 400,
            Self::RouteInconsistent(_) | Self::InsufficientBudget(_) => 422,
            Self::RouteStale(_) | Self::Conflict(_) => 409,
            Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            Self::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            Self::RouteInconsistent(_) => "ROUTE_INCONSISTENT",
            Self::RouteStale(_) => "ROUTE_STALE",
            Self::InsufficientBudget(_) => "INSUFFICIENT_BUDGET",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the error is a user-facing rejection rather than a fault.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Internal(_))
    }
}
