//! Ledger storage boundary and the in-memory store.

use std::sync::RwLock;

use super::entry::{BudgetControlEntry, DocRef};
use super::error::LedgerError;
use crate::dimension::Dimensions;

/// Append-only storage for budget control entries.
///
/// Implementations must make `append_batch` atomic: either every entry in
/// the batch becomes visible or none does.
pub trait LedgerStore: Send + Sync {
    /// Appends a batch of entries atomically.
    fn append_batch(&self, entries: Vec<BudgetControlEntry>) -> Result<(), LedgerError>;

    /// Returns every entry for a budget key.
    fn entries_for_dimensions(
        &self,
        dims: &Dimensions,
    ) -> Result<Vec<BudgetControlEntry>, LedgerError>;

    /// Returns every entry triggered by a document.
    fn entries_for_reference(&self, reference: &DocRef)
    -> Result<Vec<BudgetControlEntry>, LedgerError>;

    /// Returns every entry attributed to a spend request.
    fn entries_for_request(&self, request: &DocRef) -> Result<Vec<BudgetControlEntry>, LedgerError>;

    /// Advisory row lock for the budget key.
    ///
    /// Returns false when the store has no such facility; callers carry on.
    fn lock_for_update(&self, _dims: &Dimensions) -> bool {
        false
    }
}

/// Entries held in an append-only vector.
///
/// Each batch is appended atomically. There is no row lock, so an
/// availability check and the append that follows it can interleave with
/// other writers.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<BudgetControlEntry>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored entry in insertion order.
    pub fn all(&self) -> Result<Vec<BudgetControlEntry>, LedgerError> {
        self.filtered(|_| true)
    }

    fn filtered(
        &self,
        predicate: impl Fn(&BudgetControlEntry) -> bool,
    ) -> Result<Vec<BudgetControlEntry>, LedgerError> {
        let guard = self
            .entries
            .read()
            .map_err(|_| LedgerError::Storage("ledger lock poisoned".into()))?;
        Ok(guard.iter().filter(|e| predicate(e)).cloned().collect())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append_batch(&self, entries: Vec<BudgetControlEntry>) -> Result<(), LedgerError> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| LedgerError::Storage("ledger lock poisoned".into()))?;
        guard.extend(entries);
        Ok(())
    }

    fn entries_for_dimensions(
        &self,
        dims: &Dimensions,
    ) -> Result<Vec<BudgetControlEntry>, LedgerError> {
        self.filtered(|e| &e.dimensions == dims)
    }

    fn entries_for_reference(
        &self,
        reference: &DocRef,
    ) -> Result<Vec<BudgetControlEntry>, LedgerError> {
        self.filtered(|e| &e.reference == reference)
    }

    fn entries_for_request(&self, request: &DocRef) -> Result<Vec<BudgetControlEntry>, LedgerError> {
        self.filtered(|e| e.request.as_ref() == Some(request))
    }

}
