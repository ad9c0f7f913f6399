//! Spend request workflow.
//!
//! This module implements the request lifecycle state machine gated by
//! resolved approval routes.
//!
//! # Modules
//!
//! - `types` - Statuses, actors, transition context, notices and audit records
//! - `request` - The `SpendRequest` subject, line items and downstream links
//! - `summary` - Line-item summarization
//! - `error` - Workflow-specific error types
//! - `service` - State transition logic

pub mod error;
pub mod request;
pub mod service;
pub mod summary;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use request::{
    DownstreamLink, InternalCharge, InternalChargeLine, LineItem, LinkKind, RequestEdit,
    SpendRequest, REQUEST_DOCTYPE,
};
pub use service::RequestWorkflow;
pub use summary::{ItemSummary, summarize_items};
pub use types::{
    Actor, ApprovalIntent, AuditKind, AuditRecord, BudgetLockStatus, Notice, NoticeLevel,
    RequestStatus, Transition, TransitionContext, TransitionKind,
};
