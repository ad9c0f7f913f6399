//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::allocation::AllocationError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Entry amount cannot be negative.
    #[error("Entry amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    /// The entry store failed.
    #[error("Ledger storage error: {0}")]
    Storage(String),

    /// The allocation gateway failed.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::Storage(_) => "LEDGER_STORAGE_ERROR",
            Self::Allocation(err) => err.error_code(),
        }
    }
}
