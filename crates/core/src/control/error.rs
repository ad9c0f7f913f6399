//! Facade errors and conversions into the application error.

use spendline_shared::AppError;
use thiserror::Error;

use crate::allocation::AllocationError;
use crate::dimension::DimensionError;
use crate::ledger::LedgerError;
use crate::orchestrator::OrchestratorError;
use crate::routing::RoutingError;
use crate::settings::SettingsError;
use crate::workflow::WorkflowError;

/// Errors returned by `SpendControl`.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The workflow refused the operation.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A budget side effect failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// A ledger query failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Route resolution failed.
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

impl ControlError {
    /// Returns the HTTP status code of the application error this maps to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Workflow(err) => workflow_to_app(err).status_code(),
            Self::Orchestrator(err) => orchestrator_to_app(err).status_code(),
            Self::Ledger(err) => ledger_to_app(err).status_code(),
            Self::Routing(err) => routing_to_app(err).status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Workflow(err) => err.error_code(),
            Self::Orchestrator(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Routing(err) => err.error_code(),
        }
    }
}

fn allocation_to_app(err: &AllocationError) -> AppError {
    match err {
        AllocationError::NotFound(_) => AppError::ConfigurationMissing(err.to_string()),
        AllocationError::InvalidWindow { .. } => AppError::Validation(err.to_string()),
        AllocationError::Backend(_) => AppError::Storage(err.to_string()),
    }
}

fn routing_to_app(err: &RoutingError) -> AppError {
    match err {
        RoutingError::RouteInconsistent { .. } => AppError::RouteInconsistent(err.to_string()),
        RoutingError::Settings(_) => AppError::Storage(err.to_string()),
    }
}

fn ledger_to_app(err: &LedgerError) -> AppError {
    match err {
        LedgerError::NegativeAmount(_) => AppError::Validation(err.to_string()),
        LedgerError::Storage(_) => AppError::Storage(err.to_string()),
        LedgerError::Allocation(inner) => allocation_to_app(inner),
    }
}

fn workflow_to_app(err: &WorkflowError) -> AppError {
    let message = err.to_string();
    match err {
        WorkflowError::NotCreator { .. }
        | WorkflowError::NotRoutedApprover { .. }
        | WorkflowError::MissingRole { .. } => AppError::AuthorizationDenied(message),
        WorkflowError::RouteStale { .. } => AppError::RouteStale(message),
        WorkflowError::SkipLevel { .. }
        | WorkflowError::InvalidItem { .. }
        | WorkflowError::EmptyRequest => AppError::Validation(message),
        WorkflowError::InvalidTransition { .. }
        | WorkflowError::DownstreamActive { .. }
        | WorkflowError::KeyFieldsLocked { .. } => AppError::Conflict(message),
        WorkflowError::LinkNotFound(_) => AppError::NotFound(message),
        WorkflowError::Routing(inner) => routing_to_app(inner),
        WorkflowError::Settings(_) => AppError::Storage(message),
    }
}

fn orchestrator_to_app(err: &OrchestratorError) -> AppError {
    let message = err.to_string();
    match err {
        OrchestratorError::InsufficientBudget { .. } => AppError::InsufficientBudget(message),
        OrchestratorError::FeatureDisabled(_)
        | OrchestratorError::InvalidAmount(_)
        | OrchestratorError::SameDimensions(_)
        | OrchestratorError::Dimension(_) => AppError::Validation(message),
        OrchestratorError::Allocation(inner) => allocation_to_app(inner),
        OrchestratorError::Ledger(inner) => ledger_to_app(inner),
    }
}

impl From<ControlError> for AppError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Workflow(inner) => workflow_to_app(&inner),
            ControlError::Orchestrator(inner) => orchestrator_to_app(&inner),
            ControlError::Ledger(inner) => ledger_to_app(&inner),
            ControlError::Routing(inner) => routing_to_app(&inner),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        workflow_to_app(&err)
    }
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        orchestrator_to_app(&err)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        ledger_to_app(&err)
    }
}

impl From<RoutingError> for AppError {
    fn from(err: RoutingError) -> Self {
        routing_to_app(&err)
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        allocation_to_app(&err)
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<DimensionError> for AppError {
    fn from(err: DimensionError) -> Self {
        AppError::Validation(err.to_string())
    }
}
