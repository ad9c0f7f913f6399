//! Budget orchestration.
//!
//! Turns workflow transitions and downstream invoice events into ledger
//! postings, and executes operator-initiated reclassifications and
//! supplements against the host-held allocation.
//!
//! Every operation plans its entries, runs all availability checks and
//! only then appends the whole batch, so a failed check posts nothing.

pub mod error;
pub mod service;
pub mod slices;

#[cfg(test)]
mod service_props;

pub use error::OrchestratorError;
pub use service::{BudgetOrchestrator, RECLASS_DOCTYPE, SUPPLEMENT_DOCTYPE};
pub use slices::{BudgetSlice, BudgetSlices};
