//! Budget orchestrator service.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use spendline_shared::ControlSettings;
use spendline_shared::types::{Amount, EntryId};
use tracing::{debug, error, info, warn};

use super::error::OrchestratorError;
use super::slices::{BudgetSlice, BudgetSlices};
use crate::allocation::AllocationError;
use crate::dimension::{DimensionResolver, Dimensions};
use crate::ledger::{BudgetLedger, Direction, DocRef, EntryType, NewEntry};
use crate::workflow::{
    Actor, AuditKind, AuditRecord, BudgetLockStatus, Notice, RequestStatus, SpendRequest,
    Transition, TransitionKind,
};

/// Doctype of operator-initiated reclassifications.
pub const RECLASS_DOCTYPE: &str = "Budget Reclass";

/// Doctype of operator-initiated supplements.
pub const SUPPLEMENT_DOCTYPE: &str = "Budget Supplement";

/// Applies budget side effects of workflow transitions and invoice events.
pub struct BudgetOrchestrator {
    ledger: Arc<BudgetLedger>,
    dimensions: DimensionResolver,
}

impl BudgetOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(ledger: Arc<BudgetLedger>, dimensions: DimensionResolver) -> Self {
        Self { ledger, dimensions }
    }

    /// Returns the ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<BudgetLedger> {
        &self.ledger
    }

    /// Returns the status at which budget is reserved.
    ///
    /// Falls back to Approved when the configured value is not a status.
    #[must_use]
    pub fn lock_state(settings: &ControlSettings) -> RequestStatus {
        RequestStatus::parse(&settings.lock_on_workflow_state).unwrap_or_else(|| {
            warn!(
                value = %settings.lock_on_workflow_state,
                "Unknown lock state; using Approved"
            );
            RequestStatus::Approved
        })
    }

    /// Computes the budget slices of a request.
    pub fn slices(&self, request: &SpendRequest) -> Result<Vec<BudgetSlice>, OrchestratorError> {
        let settings = self.ledger.settings().control_settings();
        BudgetSlices::for_request(request, &self.dimensions, &settings)
    }

    /// Applies the budget effect of a workflow transition.
    ///
    /// Reaching the lock state reserves. Rejecting, cancelling, closing and
    /// reopening release; an edit releases only when it leaves the lock
    /// state. The transition's request is updated in place; nothing is posted
    /// when an error is returned.
    pub fn on_transition(
        &self,
        transition: &mut Transition,
        actor: &Actor,
    ) -> Result<Vec<EntryId>, OrchestratorError> {
        let settings = self.ledger.settings().control_settings();
        let lock_state = Self::lock_state(&settings);

        match transition.kind {
            TransitionKind::Submit
            | TransitionKind::Approve
            | TransitionKind::Reopen
            | TransitionKind::Edit
                if transition.to == lock_state =>
            {
                self.lock(
                    &mut transition.request,
                    actor,
                    &settings,
                    &mut transition.notices,
                )
            }
            TransitionKind::Edit if transition.from != lock_state => Ok(Vec::new()),
            TransitionKind::Reject
            | TransitionKind::Cancel
            | TransitionKind::Close
            | TransitionKind::Reopen
            | TransitionKind::Edit => {
                let remarks = format!("Released on {}", transition.kind);
                self.release(&mut transition.request, &remarks)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Reserves the request's slices, replacing any outstanding reservation.
    ///
    /// A request whose outstanding reservations already equal its slices is
    /// left untouched.
    fn lock(
        &self,
        request: &mut SpendRequest,
        actor: &Actor,
        settings: &ControlSettings,
        notices: &mut Vec<Notice>,
    ) -> Result<Vec<EntryId>, OrchestratorError> {
        if !settings.enable_budget_lock || !settings.enforce_mode.reserves_on_lock() {
            debug!(request = %request.reference.name, "Reservation on lock not enabled");
            return Ok(Vec::new());
        }
        if request.budget_lock_status == BudgetLockStatus::Consumed {
            debug!(request = %request.reference.name, "Budget already consumed; lock skipped");
            return Ok(Vec::new());
        }

        let slices = BudgetSlices::for_request(request, &self.dimensions, settings)?;
        let outstanding = self.outstanding(&request.reference)?;
        if Self::matches_outstanding(&slices, &outstanding) {
            debug!(request = %request.reference.name, "Reservations already current");
            return Ok(Vec::new());
        }

        let overruns = self.check_slices(&slices, &outstanding, actor, settings)?;

        let reference = request.reference.clone();
        let mut entries: Vec<NewEntry> = outstanding
            .iter()
            .map(|(dims, amount)| {
                NewEntry::new(
                    EntryType::Release,
                    dims.clone(),
                    *amount,
                    Direction::In,
                    reference.clone(),
                )
                .for_request(&reference)
                .with_remarks("Released before re-lock")
            })
            .collect();
        entries.extend(slices.into_iter().map(|slice| {
            NewEntry::new(
                EntryType::Reservation,
                slice.dimensions,
                slice.amount,
                Direction::Out,
                reference.clone(),
            )
            .for_request(&reference)
        }));

        let ids = self.ledger.post_batch(entries)?;
        if overruns.is_empty() {
            request.budget_lock_status = BudgetLockStatus::Locked;
        } else {
            Self::record_overrun(request, actor, overruns, notices);
        }

        info!(
            request = %reference.name,
            entries = ids.len(),
            status = %request.budget_lock_status,
            "Budget locked"
        );
        Ok(ids)
    }

    /// Releases every outstanding reservation of the request.
    fn release(
        &self,
        request: &mut SpendRequest,
        remarks: &str,
    ) -> Result<Vec<EntryId>, OrchestratorError> {
        let outstanding = self.outstanding(&request.reference)?;
        if outstanding.is_empty() {
            return Ok(Vec::new());
        }

        let reference = request.reference.clone();
        let entries = outstanding
            .into_iter()
            .map(|(dims, amount)| {
                NewEntry::new(
                    EntryType::Release,
                    dims,
                    amount,
                    Direction::In,
                    reference.clone(),
                )
                .for_request(&reference)
                .with_remarks(remarks)
            })
            .collect();

        let ids = self.ledger.post_batch(entries)?;
        if !ids.is_empty() && request.budget_lock_status != BudgetLockStatus::Consumed {
            request.budget_lock_status = BudgetLockStatus::Released;
        }
        info!(request = %reference.name, entries = ids.len(), "Budget released");
        Ok(ids)
    }

    /// Converts the request's reservations into consumption for an invoice.
    ///
    /// A second submit of the same invoice is a no-op. In modes that check
    /// on invoice submit, each slice must fit the available budget after
    /// crediting the request's own reservation on that key.
    pub fn on_invoice_submitted(
        &self,
        request: &mut SpendRequest,
        invoice: &DocRef,
        actor: &Actor,
    ) -> Result<Vec<EntryId>, OrchestratorError> {
        let settings = self.ledger.settings().control_settings();
        if !settings.enable_budget_lock {
            return Ok(Vec::new());
        }
        if self.is_consumed_by(invoice)? {
            debug!(invoice = %invoice, "Invoice already consumed; nothing to post");
            return Ok(Vec::new());
        }

        let slices = BudgetSlices::for_request(request, &self.dimensions, &settings)?;
        let outstanding = self.outstanding(&request.reference)?;

        let mut notices = Vec::new();
        if settings.enforce_mode.checks_on_invoice() {
            let overruns = self.check_slices(&slices, &outstanding, actor, &settings)?;
            if !overruns.is_empty() {
                Self::record_overrun(request, actor, overruns, &mut notices);
            }
        }

        let entries: Vec<NewEntry> = slices
            .into_iter()
            .filter_map(|slice| {
                let reserved = outstanding.get(&slice.dimensions).copied()?;
                let amount = slice.amount.min(reserved);
                (!Amount::is_negligible(amount)).then(|| {
                    NewEntry::new(
                        EntryType::Consumption,
                        slice.dimensions,
                        amount,
                        Direction::In,
                        invoice.clone(),
                    )
                    .for_request(&request.reference)
                })
            })
            .collect();

        let ids = self.ledger.post_batch(entries)?;
        if !ids.is_empty() {
            request.budget_lock_status = BudgetLockStatus::Consumed;
        }
        info!(
            request = %request.reference.name,
            invoice = %invoice,
            entries = ids.len(),
            "Invoice consumption posted"
        );
        Ok(ids)
    }

    /// Reverses the consumptions posted for a cancelled invoice.
    ///
    /// One REVERSAL mirrors each unreversed CONSUMPTION; the request returns
    /// to Locked. A closed or cancelled request can no longer release, so
    /// each reversal is paired with a RELEASE in the same batch and the
    /// request stays Released.
    pub fn on_invoice_cancelled(
        &self,
        request: &mut SpendRequest,
        invoice: &DocRef,
    ) -> Result<Vec<EntryId>, OrchestratorError> {
        let entries = self.ledger.entries_for_reference(invoice)?;
        let reversed = entries
            .iter()
            .filter(|e| e.finalized && e.entry_type == EntryType::Reversal)
            .count();

        let mut reversals: Vec<NewEntry> = entries
            .iter()
            .filter(|e| e.finalized && e.entry_type == EntryType::Consumption)
            .skip(reversed)
            .map(|consumption| {
                let mut reversal = NewEntry::new(
                    EntryType::Reversal,
                    consumption.dimensions.clone(),
                    consumption.amount,
                    Direction::Out,
                    invoice.clone(),
                )
                .with_remarks(format!("Reversal of {}", consumption.id));
                reversal.request.clone_from(&consumption.request);
                reversal
            })
            .collect();

        if reversals.is_empty() {
            debug!(invoice = %invoice, "No consumption to reverse");
            return Ok(Vec::new());
        }

        let terminal = matches!(
            request.status,
            RequestStatus::Closed | RequestStatus::Cancelled
        );
        if terminal {
            let reference = request.reference.clone();
            let releases: Vec<NewEntry> = reversals
                .iter()
                .map(|reversal| {
                    NewEntry::new(
                        EntryType::Release,
                        reversal.dimensions.clone(),
                        reversal.amount,
                        Direction::In,
                        reference.clone(),
                    )
                    .for_request(&reference)
                    .with_remarks(format!("Released on reversal of {invoice}"))
                })
                .collect();
            reversals.extend(releases);
        }

        let ids = self.ledger.post_batch(reversals)?;
        if !ids.is_empty() {
            request.budget_lock_status = if terminal {
                BudgetLockStatus::Released
            } else {
                BudgetLockStatus::Locked
            };
        }
        info!(
            request = %request.reference.name,
            invoice = %invoice,
            entries = ids.len(),
            status = %request.status,
            "Invoice consumption reversed"
        );
        Ok(ids)
    }

    /// Moves budget from one key to another.
    ///
    /// Posts a paired RECLASS OUT/IN and shifts the host allocation by the
    /// same amount. Both keys must have an allocation record. Allocation
    /// changes are rolled back if posting fails.
    pub fn reclass(
        &self,
        from: &Dimensions,
        to: &Dimensions,
        amount: Decimal,
        reference: &DocRef,
    ) -> Result<Vec<EntryId>, OrchestratorError> {
        let settings = self.ledger.settings().control_settings();
        if !settings.enable_budget_reclass {
            return Err(OrchestratorError::FeatureDisabled("Budget reclass"));
        }
        if amount <= Decimal::ZERO {
            return Err(OrchestratorError::InvalidAmount(amount));
        }
        if from == to {
            return Err(OrchestratorError::SameDimensions(from.to_string()));
        }
        self.require_allocation(from)?;
        self.require_allocation(to)?;

        let check = self.ledger.check_available(from, amount, None)?;
        if !check.ok {
            return Err(OrchestratorError::InsufficientBudget {
                dimensions: from.to_string(),
                available: check.snapshot.map(|s| s.available).unwrap_or_default(),
                requested: amount,
            });
        }

        let gateway = self.ledger.gateway();
        gateway.apply_allocation_delta(from, -amount, false)?;
        if let Err(err) = gateway.apply_allocation_delta(to, amount, false) {
            self.rollback_allocation(from, amount);
            return Err(err.into());
        }

        let posted = self.ledger.post_batch(vec![
            NewEntry::new(EntryType::Reclass, from.clone(), amount, Direction::Out, reference.clone())
                .with_remarks(format!("Reclass to {to}")),
            NewEntry::new(EntryType::Reclass, to.clone(), amount, Direction::In, reference.clone())
                .with_remarks(format!("Reclass from {from}")),
        ]);

        match posted {
            Ok(ids) => {
                info!(from = %from, to = %to, %amount, reference = %reference, "Budget reclassified");
                Ok(ids)
            }
            Err(err) => {
                self.rollback_allocation(from, amount);
                self.rollback_allocation(to, -amount);
                Err(err.into())
            }
        }
    }

    /// Grants additional budget to a key.
    ///
    /// Posts a SUPPLEMENT IN and raises the host allocation by the same
    /// amount. The key must have an allocation record.
    pub fn supplement(
        &self,
        dims: &Dimensions,
        amount: Decimal,
        reference: &DocRef,
    ) -> Result<Vec<EntryId>, OrchestratorError> {
        let settings = self.ledger.settings().control_settings();
        if !settings.enable_additional_budget {
            return Err(OrchestratorError::FeatureDisabled("Additional budget"));
        }
        if amount <= Decimal::ZERO {
            return Err(OrchestratorError::InvalidAmount(amount));
        }
        self.require_allocation(dims)?;

        self.ledger
            .gateway()
            .apply_allocation_delta(dims, amount, false)?;

        let posted = self.ledger.post_batch(vec![
            NewEntry::new(EntryType::Supplement, dims.clone(), amount, Direction::In, reference.clone())
                .with_remarks("Additional budget"),
        ]);

        match posted {
            Ok(ids) => {
                info!(dimensions = %dims, %amount, reference = %reference, "Budget supplemented");
                Ok(ids)
            }
            Err(err) => {
                self.rollback_allocation(dims, -amount);
                Err(err.into())
            }
        }
    }

    /// Checks every slice; returns the overrun messages the actor is allowed to accept.
    fn check_slices(
        &self,
        slices: &[BudgetSlice],
        outstanding: &BTreeMap<Dimensions, Decimal>,
        actor: &Actor,
        settings: &ControlSettings,
    ) -> Result<Vec<String>, OrchestratorError> {
        let may_overrun = actor.has_any_role(&settings.overrun_roles);
        let mut overruns = Vec::new();

        for slice in slices {
            let credit = outstanding
                .get(&slice.dimensions)
                .copied()
                .unwrap_or_default();
            let check =
                self.ledger
                    .check_available_net(&slice.dimensions, slice.amount, credit, None)?;
            if check.ok {
                continue;
            }
            if !may_overrun {
                return Err(OrchestratorError::InsufficientBudget {
                    dimensions: slice.dimensions.to_string(),
                    available: check
                        .snapshot
                        .map(|s| s.available + credit)
                        .unwrap_or_default(),
                    requested: slice.amount,
                });
            }
            overruns.push(check.message);
        }

        Ok(overruns)
    }

    fn record_overrun(
        request: &mut SpendRequest,
        actor: &Actor,
        overruns: Vec<String>,
        notices: &mut Vec<Notice>,
    ) {
        warn!(
            request = %request.reference.name,
            actor = %actor.id,
            keys = overruns.len(),
            "Budget overrun allowed"
        );
        notices.push(Notice::warning(format!(
            "Budget overrun allowed by {}",
            actor.id
        )));
        request.audit.push(
            AuditRecord::new(
                AuditKind::OverrunAllowed,
                Some(&actor.id),
                "Reserved beyond available budget",
            )
            .with_details(overruns),
        );
        request.budget_lock_status = BudgetLockStatus::OverrunAllowed;
    }

    /// Positive outstanding reservations of a request per key.
    fn outstanding(&self, request: &DocRef) -> Result<BTreeMap<Dimensions, Decimal>, OrchestratorError> {
        let mut outstanding = self.ledger.outstanding_for_request(request)?;
        outstanding.retain(|_, amount| *amount > Decimal::ZERO);
        Ok(outstanding)
    }

    fn matches_outstanding(slices: &[BudgetSlice], outstanding: &BTreeMap<Dimensions, Decimal>) -> bool {
        !slices.is_empty()
            && slices.len() == outstanding.len()
            && slices.iter().all(|slice| {
                outstanding
                    .get(&slice.dimensions)
                    .is_some_and(|amount| Amount::approx_eq(*amount, slice.amount))
            })
    }

    fn is_consumed_by(&self, invoice: &DocRef) -> Result<bool, OrchestratorError> {
        let entries = self.ledger.entries_for_reference(invoice)?;
        let count = |entry_type| {
            entries
                .iter()
                .filter(|e| e.finalized && e.entry_type == entry_type)
                .count()
        };
        Ok(count(EntryType::Consumption) > count(EntryType::Reversal))
    }

    fn require_allocation(&self, dims: &Dimensions) -> Result<(), OrchestratorError> {
        self.ledger
            .gateway()
            .allocated(dims)?
            .map(|_| ())
            .ok_or_else(|| AllocationError::NotFound(dims.to_string()).into())
    }

    fn rollback_allocation(&self, dims: &Dimensions, delta: Decimal) {
        if let Err(err) = self
            .ledger
            .gateway()
            .apply_allocation_delta(dims, delta, false)
        {
            error!(dimensions = %dims, %delta, error = %err, "Allocation rollback failed");
        }
    }
}
