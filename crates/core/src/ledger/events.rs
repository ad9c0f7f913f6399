//! Entry creation events for audit and reporting consumers.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spendline_shared::types::EntryId;
use tracing::info;

use super::entry::{BudgetControlEntry, Direction, DocRef, EntryType};
use crate::dimension::Dimensions;

/// Emitted once per created ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Created entry.
    pub entry_id: EntryId,
    /// Kind of entry.
    pub entry_type: EntryType,
    /// Budget key.
    pub dimensions: Dimensions,
    /// Entry amount.
    pub amount: Decimal,
    /// Entry direction.
    pub direction: Direction,
    /// Triggering document.
    pub reference: DocRef,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&BudgetControlEntry> for LedgerEvent {
    fn from(entry: &BudgetControlEntry) -> Self {
        Self {
            entry_id: entry.id,
            entry_type: entry.entry_type,
            dimensions: entry.dimensions.clone(),
            amount: entry.amount,
            direction: entry.direction,
            reference: entry.reference.clone(),
            created_at: entry.created_at,
        }
    }
}

/// Receiver of ledger entry events.
pub trait LedgerEventSink: Send + Sync {
    /// Called after an entry has been stored.
    fn entry_created(&self, event: &LedgerEvent);
}

/// Logs every event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl LedgerEventSink for TracingEventSink {
    fn entry_created(&self, event: &LedgerEvent) {
        info!(
            entry_id = %event.entry_id,
            entry_type = %event.entry_type,
            dimensions = %event.dimensions,
            amount = %event.amount,
            direction = %event.direction,
            reference = %event.reference,
            "Budget control entry created"
        );
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events received so far.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl LedgerEventSink for MemoryEventSink {
    fn entry_created(&self, event: &LedgerEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
