//! In-memory allocation gateway.

use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;

use super::error::AllocationError;
use super::gateway::{DateWindow, NativeAllocationGateway};
use crate::dimension::Dimensions;

/// Allocations and dated actual postings held in concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryAllocations {
    allocations: DashMap<Dimensions, Decimal>,
    actuals: DashMap<Dimensions, Vec<(NaiveDate, Decimal)>>,
}

impl InMemoryAllocations {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allocated amount for a key, creating the record if needed.
    pub fn set_allocation(&self, dims: Dimensions, amount: Decimal) {
        self.allocations.insert(dims, amount);
    }

    /// Records an actual posting against a key.
    pub fn record_actual(&self, dims: Dimensions, date: NaiveDate, amount: Decimal) {
        self.actuals.entry(dims).or_default().push((date, amount));
    }
}

impl NativeAllocationGateway for InMemoryAllocations {
    fn allocated(&self, dims: &Dimensions) -> Result<Option<Decimal>, AllocationError> {
        Ok(self.allocations.get(dims).map(|amount| *amount))
    }

    fn actual_spent(
        &self,
        dims: &Dimensions,
        window: Option<&DateWindow>,
    ) -> Result<Decimal, AllocationError> {
        let Some(postings) = self.actuals.get(dims) else {
            return Ok(Decimal::ZERO);
        };
        Ok(postings
            .iter()
            .filter(|(date, _)| window.is_none_or(|w| w.contains(*date)))
            .map(|(_, amount)| *amount)
            .sum())
    }

    fn apply_allocation_delta(
        &self,
        dims: &Dimensions,
        delta: Decimal,
        allow_row_creation: bool,
    ) -> Result<(), AllocationError> {
        match self.allocations.entry(dims.clone()) {
            Entry::Occupied(mut occupied) => {
                *occupied.get_mut() += delta;
                Ok(())
            }
            Entry::Vacant(vacant) if allow_row_creation => {
                vacant.insert(delta);
                Ok(())
            }
            Entry::Vacant(_) => Err(AllocationError::NotFound(dims.to_string())),
        }
    }
}
