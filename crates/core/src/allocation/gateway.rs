//! Allocation gateway trait.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::AllocationError;
use crate::dimension::Dimensions;

/// Inclusive date range used to restrict actual spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day of the window.
    pub from: NaiveDate,
    /// Last day of the window.
    pub to: NaiveDate,
}

impl DateWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::InvalidWindow` if `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, AllocationError> {
        if from > to {
            return Err(AllocationError::InvalidWindow { from, to });
        }
        Ok(Self { from, to })
    }

    /// Returns true if the date falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Read and adjust access to the host-maintained budget allocation.
pub trait NativeAllocationGateway: Send + Sync {
    /// Returns the allocated amount, or `None` when no allocation record exists.
    fn allocated(&self, dims: &Dimensions) -> Result<Option<Decimal>, AllocationError>;

    /// Returns actual spend, optionally restricted to a date window.
    fn actual_spent(
        &self,
        dims: &Dimensions,
        window: Option<&DateWindow>,
    ) -> Result<Decimal, AllocationError>;

    /// Adjusts the allocated amount by `delta`.
    ///
    /// Fails with `AllocationError::NotFound` when no record exists and
    /// `allow_row_creation` is false.
    fn apply_allocation_delta(
        &self,
        dims: &Dimensions,
        delta: Decimal,
        allow_row_creation: bool,
    ) -> Result<(), AllocationError>;
}
