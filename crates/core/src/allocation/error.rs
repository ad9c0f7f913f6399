//! Allocation gateway error types.

use thiserror::Error;

/// Errors raised by an allocation gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// No allocation record exists for the budget key.
    #[error("No budget allocation exists for {0}")]
    NotFound(String),

    /// Date window ends before it starts.
    #[error("Invalid date window: {from} is after {to}")]
    InvalidWindow {
        /// Window start.
        from: chrono::NaiveDate,
        /// Window end.
        to: chrono::NaiveDate,
    },

    /// The backing store failed.
    #[error("Allocation backend error: {0}")]
    Backend(String),
}

impl AllocationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ALLOCATION_NOT_FOUND",
            Self::InvalidWindow { .. } => "INVALID_DATE_WINDOW",
            Self::Backend(_) => "ALLOCATION_BACKEND_ERROR",
        }
    }
}
