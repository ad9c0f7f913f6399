//! Dimension error types.

use thiserror::Error;

/// Errors raised when a partially resolved key is used where a full key is required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    /// A required dimension could not be resolved.
    #[error("Budget dimension {field} could not be resolved for cost center {cost_center}")]
    Missing {
        /// The unresolved field.
        field: &'static str,
        /// The cost center being resolved.
        cost_center: String,
    },
}

impl DimensionError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "DIMENSION_MISSING",
        }
    }
}
