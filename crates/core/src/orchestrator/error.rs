//! Orchestrator error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::allocation::AllocationError;
use crate::dimension::DimensionError;
use crate::ledger::LedgerError;

/// Errors that can occur while applying budget side effects.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Requested amount exceeds the available budget.
    #[error("Insufficient budget for {dimensions}: available {available}, requested {requested}")]
    InsufficientBudget {
        /// Budget key.
        dimensions: String,
        /// Available amount, including the request's own outstanding reservation.
        available: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// The feature gating an operator operation is disabled.
    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    /// Amount must be positive.
    #[error("Amount must be positive: {0}")]
    InvalidAmount(Decimal),

    /// Source and target of a reclassification are the same key.
    #[error("Cannot reclassify budget onto the same dimensions: {0}")]
    SameDimensions(String),

    /// A dimension could not be resolved.
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    /// The allocation gateway failed.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl OrchestratorError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InsufficientBudget { .. } => 422,
            Self::FeatureDisabled(_)
            | Self::InvalidAmount(_)
            | Self::SameDimensions(_)
            | Self::Dimension(_) => 400,
            Self::Allocation(AllocationError::NotFound(_)) => 404,
            Self::Allocation(AllocationError::InvalidWindow { .. }) => 400,
            Self::Allocation(_) | Self::Ledger(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientBudget { .. } => "INSUFFICIENT_BUDGET",
            Self::FeatureDisabled(_) => "FEATURE_DISABLED",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::SameDimensions(_) => "SAME_DIMENSIONS",
            Self::Dimension(err) => err.error_code(),
            Self::Allocation(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
        }
    }
}
