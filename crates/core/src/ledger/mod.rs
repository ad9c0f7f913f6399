//! Budget control ledger.
//!
//! This module implements the append-only store of signed budget-control
//! entries and the availability math over it:
//! - Entry types, directions, and document references
//! - The storage boundary with an in-memory implementation
//! - Posting events for audit and reporting consumers
//! - Availability snapshots and checks
//!
//! `available = allocated - actual - reserved`, where `reserved` is the
//! signed sum of finalized entries for the budget key.

pub mod entry;
pub mod error;
pub mod events;
pub mod service;
pub mod store;

#[cfg(test)]
mod service_props;

pub use entry::{BudgetControlEntry, Direction, DocRef, EntryType, NewEntry};
pub use error::LedgerError;
pub use events::{LedgerEvent, LedgerEventSink, MemoryEventSink, TracingEventSink};
pub use service::{AvailabilityCheck, AvailabilitySnapshot, BudgetLedger};
pub use store::{InMemoryLedgerStore, LedgerStore};
