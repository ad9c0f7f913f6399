//! Budget ledger service.
//!
//! The ledger is the single source of truth for the reserved figure of a
//! budget key. It combines the host-held allocation and actual spend with
//! the signed sum of its own entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spendline_shared::types::{Amount, EntryId};
use tracing::{debug, info};

use super::entry::{BudgetControlEntry, DocRef, EntryType, NewEntry};
use super::error::LedgerError;
use super::events::{LedgerEvent, LedgerEventSink};
use super::store::LedgerStore;
use crate::allocation::{DateWindow, NativeAllocationGateway};
use crate::dimension::Dimensions;
use crate::settings::SettingsProvider;

/// Derived availability for a budget key. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    /// Allocated amount held by the host.
    pub allocated: Decimal,
    /// Actual spend in the window.
    pub actual: Decimal,
    /// Signed sum of reserving entries, net of consumptions and releases.
    pub reserved: Decimal,
    /// Gross amount released so far.
    pub released: Decimal,
    /// `allocated - actual - reserved`.
    pub available: Decimal,
    /// Window applied to actual spend.
    pub window: Option<DateWindow>,
}

/// Outcome of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityCheck {
    /// Whether the requested amount fits.
    pub ok: bool,
    /// Human-readable explanation, also used for bypasses.
    pub message: String,
    /// Availability used for the decision; `None` when the check was bypassed.
    pub snapshot: Option<AvailabilitySnapshot>,
}

impl AvailabilityCheck {
    /// Returns true if the check was skipped rather than evaluated.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// Budget ledger over an entry store and an allocation gateway.
pub struct BudgetLedger {
    store: Arc<dyn LedgerStore>,
    gateway: Arc<dyn NativeAllocationGateway>,
    settings: Arc<dyn SettingsProvider>,
    sinks: Vec<Arc<dyn LedgerEventSink>>,
}

impl BudgetLedger {
    /// Creates a ledger.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        gateway: Arc<dyn NativeAllocationGateway>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
            sinks: Vec::new(),
        }
    }

    /// Registers an event sink notified after every stored entry.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LedgerEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the allocation gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn NativeAllocationGateway> {
        &self.gateway
    }

    /// Returns the settings provider.
    #[must_use]
    pub fn settings(&self) -> &Arc<dyn SettingsProvider> {
        &self.settings
    }

    /// Computes availability for a budget key.
    ///
    /// A key without an allocation record reads as allocated zero.
    pub fn get_availability(
        &self,
        dims: &Dimensions,
        window: Option<&DateWindow>,
    ) -> Result<AvailabilitySnapshot, LedgerError> {
        let allocated = self.gateway.allocated(dims)?.unwrap_or(Decimal::ZERO);
        self.snapshot(dims, allocated, window)
    }

    /// Checks whether `amount` fits in the available budget.
    pub fn check_available(
        &self,
        dims: &Dimensions,
        amount: Decimal,
        window: Option<&DateWindow>,
    ) -> Result<AvailabilityCheck, LedgerError> {
        self.check_available_net(dims, amount, Decimal::ZERO, window)
    }

    /// Checks availability after crediting back `credit`.
    ///
    /// `credit` is the caller's own outstanding reservation on the key,
    /// which a re-lock or consumption replaces rather than adds to.
    pub fn check_available_net(
        &self,
        dims: &Dimensions,
        amount: Decimal,
        credit: Decimal,
        window: Option<&DateWindow>,
    ) -> Result<AvailabilityCheck, LedgerError> {
        if !self.settings.control_settings().enable_budget_lock {
            let message = "Budget lock is disabled; availability not checked".to_string();
            debug!(dimensions = %dims, %amount, "{message}");
            return Ok(AvailabilityCheck {
                ok: true,
                message,
                snapshot: None,
            });
        }

        let Some(allocated) = self.gateway.allocated(dims)? else {
            let message = format!("No budget allocation for {dims}; availability not checked");
            info!(dimensions = %dims, %amount, "Availability check bypassed: no allocation");
            return Ok(AvailabilityCheck {
                ok: true,
                message,
                snapshot: None,
            });
        };

        let snapshot = self.snapshot(dims, allocated, window)?;
        let effective = snapshot.available + credit;
        let ok = Amount::covers(effective, amount);
        let message = if ok {
            format!("Budget available for {dims}: {effective} covers {amount}")
        } else {
            format!("Insufficient budget for {dims}: available {effective}, requested {amount}")
        };

        debug!(
            dimensions = %dims,
            %amount,
            available = %effective,
            ok,
            "Availability checked"
        );

        Ok(AvailabilityCheck {
            ok,
            message,
            snapshot: Some(snapshot),
        })
    }

    /// Posts a single entry.
    ///
    /// Returns `None` when the feature gating the entry type is disabled.
    pub fn post_entry(&self, entry: NewEntry) -> Result<Option<EntryId>, LedgerError> {
        Ok(self.post_batch(vec![entry])?.into_iter().next())
    }

    /// Posts a batch of entries in one atomic append.
    ///
    /// Entries whose type is disabled are dropped; the ids of the stored
    /// entries are returned in input order.
    pub fn post_batch(&self, entries: Vec<NewEntry>) -> Result<Vec<EntryId>, LedgerError> {
        let settings = self.settings.control_settings();
        let now = Utc::now();

        let mut finalized = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.amount.is_sign_negative() {
                return Err(LedgerError::NegativeAmount(entry.amount));
            }
            if !entry.entry_type.is_enabled(&settings) {
                debug!(
                    entry_type = %entry.entry_type,
                    reference = %entry.reference,
                    "Entry type disabled; posting skipped"
                );
                continue;
            }
            finalized.push(entry.finalize(now));
        }

        if finalized.is_empty() {
            return Ok(Vec::new());
        }

        for entry in &finalized {
            if !self.store.lock_for_update(&entry.dimensions) {
                debug!(dimensions = %entry.dimensions, "Row lock not supported by ledger store");
            }
        }

        let ids: Vec<EntryId> = finalized.iter().map(|e| e.id).collect();
        let events: Vec<LedgerEvent> = finalized.iter().map(LedgerEvent::from).collect();
        self.store.append_batch(finalized)?;

        for event in &events {
            info!(
                entry_type = %event.entry_type,
                dimensions = %event.dimensions,
                amount = %event.amount,
                direction = %event.direction,
                reference = %event.reference,
                "Ledger entry posted"
            );
            for sink in &self.sinks {
                sink.entry_created(event);
            }
        }

        Ok(ids)
    }

    /// Returns true if a finalized entry of the given type exists for a document.
    pub fn has_entry(&self, reference: &DocRef, entry_type: EntryType) -> Result<bool, LedgerError> {
        Ok(self
            .store
            .entries_for_reference(reference)?
            .iter()
            .any(|e| e.finalized && e.entry_type == entry_type))
    }

    /// Returns every entry triggered by a document.
    pub fn entries_for_reference(
        &self,
        reference: &DocRef,
    ) -> Result<Vec<BudgetControlEntry>, LedgerError> {
        self.store.entries_for_reference(reference)
    }

    /// Returns every entry attributed to a spend request.
    pub fn entries_for_request(
        &self,
        request: &DocRef,
    ) -> Result<Vec<BudgetControlEntry>, LedgerError> {
        self.store.entries_for_request(request)
    }

    /// Returns the request's net reserved amount per budget key.
    ///
    /// Keys that net to zero are omitted.
    pub fn outstanding_for_request(
        &self,
        request: &DocRef,
    ) -> Result<BTreeMap<Dimensions, Decimal>, LedgerError> {
        let mut outstanding: BTreeMap<Dimensions, Decimal> = BTreeMap::new();
        for entry in self.store.entries_for_request(request)? {
            let effect = entry.reserved_effect();
            if !effect.is_zero() {
                *outstanding.entry(entry.dimensions).or_default() += effect;
            }
        }
        outstanding.retain(|_, amount| !Amount::is_negligible(*amount));
        Ok(outstanding)
    }

    /// Returns the request's total contribution to the reserved figure.
    pub fn request_contribution(&self, request: &DocRef) -> Result<Decimal, LedgerError> {
        Ok(self
            .store
            .entries_for_request(request)?
            .iter()
            .map(BudgetControlEntry::reserved_effect)
            .sum())
    }

    fn snapshot(
        &self,
        dims: &Dimensions,
        allocated: Decimal,
        window: Option<&DateWindow>,
    ) -> Result<AvailabilitySnapshot, LedgerError> {
        let actual = self.gateway.actual_spent(dims, window)?;
        let entries = self.store.entries_for_dimensions(dims)?;
        let reserved: Decimal = entries.iter().map(BudgetControlEntry::reserved_effect).sum();
        let released: Decimal = entries.iter().map(BudgetControlEntry::released_amount).sum();

        Ok(AvailabilitySnapshot {
            allocated,
            actual,
            reserved,
            released,
            available: allocated - actual - reserved,
            window: window.copied(),
        })
    }
}
