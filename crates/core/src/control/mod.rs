//! Spend control facade.
//!
//! `SpendControl` wires the resolver, workflow, ledger and orchestrator
//! together and runs each workflow operation with its budget side effects
//! as one all-or-nothing unit. Every module error converts into
//! `spendline_shared::AppError`.

pub mod error;
pub mod service;

pub use error::ControlError;
pub use service::{InvoiceOutcome, SpendControl, SpendControlBuilder};
