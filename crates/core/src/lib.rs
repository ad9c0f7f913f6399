//! Core business logic for Spendline.
//!
//! This crate contains the spending control plane with ZERO web or database
//! dependencies. Host-system integrations (ledger storage, allocation
//! records, settings, dimension defaults) are traits with in-memory
//! implementations.
//!
//! # Modules
//!
//! - `dimension` - Budget key resolution from explicit values and defaults
//! - `allocation` - Gateway to host allocation and actual-spend records
//! - `settings` - Control settings and approval settings, with caching
//! - `ledger` - Append-only budget control ledger and availability
//! - `routing` - Approval route resolution from amount brackets
//! - `workflow` - Spend request lifecycle state machine
//! - `orchestrator` - Budget side effects of workflow and invoice events
//! - `control` - Facade running each operation as one unit

pub mod allocation;
pub mod control;
pub mod dimension;
pub mod ledger;
pub mod orchestrator;
pub mod routing;
pub mod settings;
pub mod workflow;

pub use control::{ControlError, InvoiceOutcome, SpendControl, SpendControlBuilder};
pub use dimension::Dimensions;
pub use ledger::{BudgetLedger, DocRef};
pub use workflow::{Actor, ApprovalIntent, RequestStatus, SpendRequest, TransitionContext};
