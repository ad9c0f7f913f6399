//! Scripted lifecycle for the simulator.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use spendline_core::allocation::InMemoryAllocations;
use spendline_core::dimension::StaticDimensionLookup;
use spendline_core::ledger::AvailabilitySnapshot;
use spendline_core::orchestrator::{RECLASS_DOCTYPE, SUPPLEMENT_DOCTYPE};
use spendline_core::routing::{ApprovalLine, ApprovalSetting, LevelApprover, LineLevel};
use spendline_core::settings::StaticSettings;
use spendline_core::workflow::{DownstreamLink, LineItem, LinkKind};
use spendline_core::{
    Actor, ApprovalIntent, ControlError, Dimensions, DocRef, SpendControl, SpendRequest,
    TransitionContext,
};

const COMPANY: &str = "ACME";
const FISCAL_YEAR: &str = "2026";
const COST_CENTER: &str = "CC-OPS";

/// Budget position of one key at the end of the run.
#[derive(Debug, Serialize)]
pub struct Position {
    /// Budget key.
    pub dimensions: String,
    /// Availability on the key.
    pub availability: AvailabilitySnapshot,
}

/// Summary printed by the simulator.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Request name.
    pub request: String,
    /// Final workflow status.
    pub status: String,
    /// Final budget lock status.
    pub budget_lock_status: String,
    /// Audit trail messages.
    pub audit: Vec<String>,
    /// Budget position per key.
    pub positions: Vec<Position>,
}

fn dims(account: &str) -> Dimensions {
    Dimensions::new(COMPANY, FISCAL_YEAR, COST_CENTER, account)
}

/// Host defaults for dimension resolution.
pub fn lookup() -> StaticDimensionLookup {
    StaticDimensionLookup::new()
        .with_cost_center(COST_CENTER, COMPANY)
        .with_user_fiscal_year("erin", FISCAL_YEAR)
}

/// Seeds allocations, prior actual spend and the approval setting.
pub fn seed(settings: &StaticSettings, allocations: &Arc<InMemoryAllocations>) {
    allocations.set_allocation(dims("5110"), Decimal::new(10_000, 0));
    allocations.set_allocation(dims("5120"), Decimal::new(5_000, 0));
    allocations.record_actual(dims("5110"), Utc::now().date_naive(), Decimal::new(1_250, 0));

    settings.put_approval_setting(
        ApprovalSetting::new("OPS Approvals", COST_CENTER)
            .with_line(
                ApprovalLine::default_line(Decimal::ZERO, Some(Decimal::new(999_999, 2)))
                    .level(1, LineLevel::new(LevelApprover::user("bob"))),
            )
            .with_line(
                ApprovalLine::default_line(Decimal::new(10_000, 0), None)
                    .level(1, LineLevel::new(LevelApprover::user("bob")))
                    .level(2, LineLevel::new(LevelApprover::role("Finance Manager"))),
            ),
    );
    info!("Seeded allocations and approval settings");
}

/// Runs one request from draft to closed.
pub fn run(control: &SpendControl) -> Result<Report, ControlError> {
    let erin = Actor::new("erin");
    let bob = Actor::new("bob");
    let frank = Actor::new("frank").with_role("Finance Manager");
    let ctx = TransitionContext::default();

    let draft = SpendRequest::draft("ER-0001", "erin", COST_CENTER)
        .with_item(LineItem::new("5110", Decimal::new(8_500, 0)).with_description("Field equipment"))
        .with_item(LineItem::new("5120", Decimal::new(2_000, 0)).with_description("Travel"));

    let mut request = control.submit(&draft, &erin, &ctx)?.request;
    info!(level = request.current_level, "Submitted");

    request = control
        .approve(&request, &bob, ApprovalIntent::Advance, &ctx)?
        .request;
    request = control
        .approve(&request, &frank, ApprovalIntent::Final, &ctx)?
        .request;
    info!(status = %request.status, lock = %request.budget_lock_status, "Approved");

    let link = DownstreamLink::new(LinkKind::PurchaseInvoice, "PI-0001");
    let invoice = link.reference.clone();
    request = control.link(&request, link, &erin)?.request;
    request = control.invoice_submitted(&request, &invoice, &erin)?.request;
    info!(lock = %request.budget_lock_status, "Invoice consumed");

    let settings = control.control_settings();
    if settings.enable_budget_reclass {
        control.reclass(
            &dims("5120"),
            &dims("5110"),
            Decimal::new(500, 0),
            &DocRef::new(RECLASS_DOCTYPE, "BR-0001"),
        )?;
    }
    if settings.enable_additional_budget {
        control.supplement(
            &dims("5120"),
            Decimal::new(1_000, 0),
            &DocRef::new(SUPPLEMENT_DOCTYPE, "BS-0001"),
        )?;
    }

    request = control.close(&request, &erin)?.request;
    info!(status = %request.status, "Closed");

    let positions = ["5110", "5120"]
        .into_iter()
        .map(|account| {
            let key = dims(account);
            control.availability(&key, None).map(|availability| Position {
                dimensions: key.to_string(),
                availability,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Report {
        request: request.reference.name.clone(),
        status: request.status.to_string(),
        budget_lock_status: request.budget_lock_status.to_string(),
        audit: request.audit.iter().map(|a| a.message.clone()).collect(),
        positions,
    })
}
