//! Spend control facade.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use spendline_shared::ControlSettings;
use spendline_shared::types::EntryId;
use tracing::{debug, info};

use super::error::ControlError;
use crate::allocation::{DateWindow, NativeAllocationGateway};
use crate::dimension::{DimensionInput, DimensionLookup, DimensionResolver, Dimensions, ResolvedDimensions};
use crate::ledger::{AvailabilityCheck, AvailabilitySnapshot, BudgetLedger, DocRef, LedgerEventSink, LedgerStore};
use crate::orchestrator::{BudgetOrchestrator, BudgetSlice};
use crate::routing::{ApprovalRouteResolver, RouteResolution};
use crate::settings::SettingsProvider;
use crate::workflow::{
    Actor, ApprovalIntent, DownstreamLink, RequestEdit, RequestWorkflow, SpendRequest, Transition,
    TransitionContext, WorkflowError,
};

/// Entry point for callers: workflow operations with their budget effects.
///
/// Each operation either returns the updated request together with every
/// ledger entry it posted, or fails without posting anything. Callers keep
/// the input request on error.
pub struct SpendControl {
    settings: Arc<dyn SettingsProvider>,
    ledger: Arc<BudgetLedger>,
    dimensions: DimensionResolver,
    routes: ApprovalRouteResolver,
    workflow: RequestWorkflow,
    orchestrator: BudgetOrchestrator,
}

/// Result of an invoice event applied to a request.
#[derive(Debug, Clone)]
pub struct InvoiceOutcome {
    /// The request after the event.
    pub request: SpendRequest,
    /// Entries posted for the event.
    pub entries: Vec<EntryId>,
}

impl SpendControl {
    /// Wires a control plane from its adapters.
    #[must_use]
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        store: Arc<dyn LedgerStore>,
        gateway: Arc<dyn NativeAllocationGateway>,
        lookup: Arc<dyn DimensionLookup>,
    ) -> Self {
        let ledger = Arc::new(BudgetLedger::new(store, gateway, settings.clone()));
        Self::from_ledger(ledger, lookup)
    }

    /// Wires a control plane around an existing ledger.
    #[must_use]
    pub fn from_ledger(ledger: Arc<BudgetLedger>, lookup: Arc<dyn DimensionLookup>) -> Self {
        let settings = ledger.settings().clone();
        let dimensions = DimensionResolver::new(lookup);
        Self {
            routes: ApprovalRouteResolver::new(settings.clone()),
            workflow: RequestWorkflow::new(settings.clone()),
            orchestrator: BudgetOrchestrator::new(ledger.clone(), dimensions.clone()),
            dimensions,
            ledger,
            settings,
        }
    }

    /// Returns the ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<BudgetLedger> {
        &self.ledger
    }

    /// Returns the workflow.
    #[must_use]
    pub fn workflow(&self) -> &RequestWorkflow {
        &self.workflow
    }

    /// Returns the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &BudgetOrchestrator {
        &self.orchestrator
    }

    /// Returns the current control settings.
    #[must_use]
    pub fn control_settings(&self) -> ControlSettings {
        self.settings.control_settings()
    }

    /// Drops cached settings so the next read hits the source.
    pub fn invalidate_settings(&self) {
        debug!("Invalidating settings cache");
        self.settings.invalidate();
    }

    /// Resolves budget dimensions for a cost center.
    #[must_use]
    pub fn resolve_dimensions(&self, input: &DimensionInput, cost_center: &str) -> ResolvedDimensions {
        self.dimensions
            .resolve(input, cost_center, &self.settings.control_settings())
    }

    /// Resolves the approval route for a prospective request.
    pub fn resolve_route(
        &self,
        cost_center: &str,
        accounts: &BTreeSet<String>,
        amount: Decimal,
    ) -> Result<RouteResolution, ControlError> {
        Ok(self.routes.resolve(cost_center, accounts, amount)?)
    }

    /// Returns the budget slices a request would reserve.
    pub fn slices(&self, request: &SpendRequest) -> Result<Vec<BudgetSlice>, ControlError> {
        Ok(self.orchestrator.slices(request)?)
    }

    /// Returns availability on a budget key.
    pub fn availability(
        &self,
        dims: &Dimensions,
        window: Option<&DateWindow>,
    ) -> Result<AvailabilitySnapshot, ControlError> {
        Ok(self.ledger.get_availability(dims, window)?)
    }

    /// Checks whether an amount fits the available budget on a key.
    pub fn check_available(
        &self,
        dims: &Dimensions,
        amount: Decimal,
        window: Option<&DateWindow>,
    ) -> Result<AvailabilityCheck, ControlError> {
        Ok(self.ledger.check_available(dims, amount, window)?)
    }

    /// Submits a draft request.
    pub fn submit(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.submit(request, actor, ctx), actor)
    }

    /// Approves the current level of a pending request.
    pub fn approve(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        intent: ApprovalIntent,
        ctx: &TransitionContext,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.approve(request, actor, intent, ctx), actor)
    }

    /// Rejects a pending request.
    pub fn reject(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.reject(request, actor, ctx), actor)
    }

    /// Reopens an approved, rejected or completed request.
    pub fn reopen(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.reopen(request, actor, ctx), actor)
    }

    /// Cancels a request.
    pub fn cancel(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.cancel(request, actor, ctx), actor)
    }

    /// Applies an edit to a request.
    pub fn edit(
        &self,
        request: &SpendRequest,
        edit: &RequestEdit,
        actor: &Actor,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.apply_edit(request, edit, actor), actor)
    }

    /// Records a downstream document against a request.
    pub fn link(
        &self,
        request: &SpendRequest,
        link: DownstreamLink,
        actor: &Actor,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.link(request, link), actor)
    }

    /// Marks a downstream document as cancelled.
    pub fn cancel_link(
        &self,
        request: &SpendRequest,
        reference: &DocRef,
        actor: &Actor,
    ) -> Result<Transition, ControlError> {
        self.apply(self.workflow.cancel_link(request, reference), actor)
    }

    /// Closes a completed request, releasing anything still reserved.
    pub fn close(&self, request: &SpendRequest, actor: &Actor) -> Result<Transition, ControlError> {
        self.apply(self.workflow.close(request, actor), actor)
    }

    /// Converts a request's reservation into consumption for an invoice.
    pub fn invoice_submitted(
        &self,
        request: &SpendRequest,
        invoice: &DocRef,
        actor: &Actor,
    ) -> Result<InvoiceOutcome, ControlError> {
        let mut next = request.clone();
        let entries = self
            .orchestrator
            .on_invoice_submitted(&mut next, invoice, actor)?;
        Ok(InvoiceOutcome {
            request: next,
            entries,
        })
    }

    /// Reverses the consumption posted for a cancelled invoice.
    pub fn invoice_cancelled(
        &self,
        request: &SpendRequest,
        invoice: &DocRef,
    ) -> Result<InvoiceOutcome, ControlError> {
        let mut next = request.clone();
        let entries = self.orchestrator.on_invoice_cancelled(&mut next, invoice)?;
        Ok(InvoiceOutcome {
            request: next,
            entries,
        })
    }

    /// Moves budget between two keys.
    pub fn reclass(
        &self,
        from: &Dimensions,
        to: &Dimensions,
        amount: Decimal,
        reference: &DocRef,
    ) -> Result<Vec<EntryId>, ControlError> {
        Ok(self.orchestrator.reclass(from, to, amount, reference)?)
    }

    /// Grants additional budget to a key.
    pub fn supplement(
        &self,
        dims: &Dimensions,
        amount: Decimal,
        reference: &DocRef,
    ) -> Result<Vec<EntryId>, ControlError> {
        Ok(self.orchestrator.supplement(dims, amount, reference)?)
    }

    fn apply(
        &self,
        transition: Result<Transition, WorkflowError>,
        actor: &Actor,
    ) -> Result<Transition, ControlError> {
        let mut transition = transition?;
        let entries = self.orchestrator.on_transition(&mut transition, actor)?;
        info!(
            request = %transition.request.reference.name,
            action = %transition.kind,
            from = %transition.from,
            to = %transition.to,
            entries = entries.len(),
            "Transition applied"
        );
        Ok(transition)
    }
}

/// Builder for a control plane with event sinks attached to its ledger.
pub struct SpendControlBuilder {
    settings: Arc<dyn SettingsProvider>,
    store: Arc<dyn LedgerStore>,
    gateway: Arc<dyn NativeAllocationGateway>,
    lookup: Arc<dyn DimensionLookup>,
    sinks: Vec<Arc<dyn LedgerEventSink>>,
}

impl SpendControlBuilder {
    /// Starts a builder from the required adapters.
    #[must_use]
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        store: Arc<dyn LedgerStore>,
        gateway: Arc<dyn NativeAllocationGateway>,
        lookup: Arc<dyn DimensionLookup>,
    ) -> Self {
        Self {
            settings,
            store,
            gateway,
            lookup,
            sinks: Vec::new(),
        }
    }

    /// Adds a ledger event sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LedgerEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builds the control plane.
    #[must_use]
    pub fn build(self) -> SpendControl {
        let ledger = self
            .sinks
            .into_iter()
            .fold(BudgetLedger::new(self.store, self.gateway, self.settings), |ledger, sink| {
                ledger.with_sink(sink)
            });
        SpendControl::from_ledger(Arc::new(ledger), self.lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::InMemoryAllocations;
    use crate::dimension::StaticDimensionLookup;
    use crate::ledger::{EntryType, InMemoryLedgerStore, MemoryEventSink};
    use crate::orchestrator::OrchestratorError;
    use crate::routing::{ApprovalLine, ApprovalSetting, LevelApprover, LineLevel};
    use crate::settings::StaticSettings;
    use crate::workflow::{BudgetLockStatus, LineItem, LinkKind, RequestStatus};
    use rust_decimal_macros::dec;
    use spendline_shared::AppError;

    struct Fixture {
        control: SpendControl,
        allocations: Arc<InMemoryAllocations>,
        settings: Arc<StaticSettings>,
        events: Arc<MemoryEventSink>,
    }

    fn fixture() -> Fixture {
        let settings = Arc::new(StaticSettings::new(ControlSettings::default()));
        settings.put_approval_setting(
            ApprovalSetting::new("OPS Approvals", "CC-OPS").with_line(
                ApprovalLine::default_line(dec!(0), None)
                    .level(1, LineLevel::new(LevelApprover::user("bob"))),
            ),
        );
        let allocations = Arc::new(InMemoryAllocations::new());
        let events = Arc::new(MemoryEventSink::default());
        let control = SpendControlBuilder::new(
            settings.clone(),
            Arc::new(InMemoryLedgerStore::new()),
            allocations.clone(),
            Arc::new(
                StaticDimensionLookup::new()
                    .with_cost_center("CC-OPS", "ACME")
                    .with_user_fiscal_year("erin", "2026"),
            ),
        )
        .sink(events.clone())
        .build();
        Fixture {
            control,
            allocations,
            settings,
            events,
        }
    }

    fn dims() -> Dimensions {
        Dimensions::new("ACME", "2026", "CC-OPS", "5110")
    }

    fn draft(amount: Decimal) -> SpendRequest {
        SpendRequest::draft("ER-0001", "erin", "CC-OPS").with_item(LineItem::new("5110", amount))
    }

    fn ctx() -> TransitionContext {
        TransitionContext::default()
    }

    fn approve(f: &Fixture, amount: Decimal) -> Result<Transition, ControlError> {
        let pending = f
            .control
            .submit(&draft(amount), &Actor::new("erin"), &ctx())?
            .request;
        f.control
            .approve(&pending, &Actor::new("bob"), ApprovalIntent::Final, &ctx())
    }

    #[test]
    fn test_approval_reserves_budget() {
        let f = fixture();
        f.allocations.set_allocation(dims(), dec!(1000));

        let t = approve(&f, dec!(400)).unwrap();
        assert_eq!(t.to, RequestStatus::Approved);
        assert_eq!(t.request.budget_lock_status, BudgetLockStatus::Locked);

        let snapshot = f.control.availability(&dims(), None).unwrap();
        assert_eq!(snapshot.reserved, dec!(400));
        assert_eq!(snapshot.available, dec!(600));
        assert_eq!(f.events.events().len(), 1);
        assert_eq!(f.events.events()[0].entry_type, EntryType::Reservation);
    }

    #[test]
    fn test_insufficient_budget_posts_nothing() {
        let f = fixture();
        f.allocations.set_allocation(dims(), dec!(100));

        let err = approve(&f, dec!(400)).unwrap_err();
        assert!(matches!(
            err,
            ControlError::Orchestrator(OrchestratorError::InsufficientBudget { .. })
        ));
        assert!(matches!(AppError::from(err), AppError::InsufficientBudget(_)));
        assert!(f.events.events().is_empty());
        assert_eq!(
            f.control.availability(&dims(), None).unwrap().available,
            dec!(100)
        );
    }

    #[test]
    fn test_invoice_lifecycle_through_facade() {
        let f = fixture();
        f.allocations.set_allocation(dims(), dec!(1000));
        let approved = approve(&f, dec!(400)).unwrap().request;
        let invoice = DocRef::new("Purchase Invoice", "PI-0001");

        let consumed = f
            .control
            .invoice_submitted(&approved, &invoice, &Actor::new("erin"))
            .unwrap();
        assert_eq!(consumed.entries.len(), 1);
        assert_eq!(consumed.request.budget_lock_status, BudgetLockStatus::Consumed);
        assert_eq!(approved.budget_lock_status, BudgetLockStatus::Locked);

        let snapshot = f.control.availability(&dims(), None).unwrap();
        assert_eq!(snapshot.reserved, dec!(0));
        assert_eq!(snapshot.available, dec!(600));

        let reversed = f
            .control
            .invoice_cancelled(&consumed.request, &invoice)
            .unwrap();
        assert_eq!(reversed.request.budget_lock_status, BudgetLockStatus::Locked);
        assert_eq!(
            f.control.availability(&dims(), None).unwrap().reserved,
            dec!(400)
        );
    }

    #[test]
    fn test_cancel_link_keeps_reservation() {
        let f = fixture();
        f.allocations.set_allocation(dims(), dec!(1000));
        let approved = approve(&f, dec!(400)).unwrap().request;
        let erin = Actor::new("erin");

        let linked = f
            .control
            .link(&approved, DownstreamLink::new(LinkKind::Payment, "PE-0001"), &erin)
            .unwrap();
        assert_eq!(linked.to, RequestStatus::Paid);

        let back = f
            .control
            .cancel_link(&linked.request, &DocRef::new("Payment Entry", "PE-0001"), &erin)
            .unwrap();
        assert_eq!(back.to, RequestStatus::Approved);
        assert_eq!(
            f.control.availability(&dims(), None).unwrap().reserved,
            dec!(400)
        );
    }

    #[test]
    fn test_close_releases_reservation() {
        let f = fixture();
        f.allocations.set_allocation(dims(), dec!(1000));
        let approved = approve(&f, dec!(400)).unwrap().request;

        let closed = f.control.close(&approved, &Actor::new("erin")).unwrap();
        assert_eq!(closed.to, RequestStatus::Closed);
        assert_eq!(closed.request.budget_lock_status, BudgetLockStatus::Released);
        assert_eq!(
            f.control.availability(&dims(), None).unwrap().available,
            dec!(1000)
        );
    }

    #[test]
    fn test_disabled_reclass_maps_to_validation() {
        let f = fixture();
        let err = f
            .control
            .reclass(
                &dims(),
                &dims().rekeyed("CC-OPS", "5120"),
                dec!(10),
                &DocRef::new("Budget Reclass", "BR-1"),
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "FEATURE_DISABLED");
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }

    #[test]
    fn test_resolve_route_reflects_settings_after_invalidate() {
        let f = fixture();
        let accounts = BTreeSet::from(["5110".to_string()]);
        let before = f.control.resolve_route("CC-OPS", &accounts, dec!(10)).unwrap();
        assert!(!before.is_auto_approve());

        f.settings.remove_approval_setting("CC-OPS");
        f.control.invalidate_settings();
        let after = f.control.resolve_route("CC-OPS", &accounts, dec!(10)).unwrap();
        assert!(matches!(after, RouteResolution::ConfigMissing { .. }));
    }

    #[test]
    fn test_resolve_dimensions_uses_lookup() {
        let f = fixture();
        let input = DimensionInput {
            account: Some("5110".into()),
            user: Some("erin".into()),
            ..DimensionInput::default()
        };
        let resolved = f.control.resolve_dimensions(&input, "CC-OPS");
        assert_eq!(resolved.into_dimensions().unwrap(), dims());
    }
}
