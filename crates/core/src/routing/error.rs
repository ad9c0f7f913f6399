//! Routing error types.

use thiserror::Error;

use crate::settings::SettingsError;

/// Errors that can occur while resolving an approval route.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Two accounts on one request resolved to different non-empty routes.
    #[error(
        "Accounts {first_account} and {second_account} resolve to different approval routes for cost center {cost_center}"
    )]
    RouteInconsistent {
        /// The cost center being resolved.
        cost_center: String,
        /// The account whose route was taken as reference.
        first_account: String,
        /// The account whose route differs.
        second_account: String,
    },

    /// The settings provider failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl RoutingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RouteInconsistent { .. } => "ROUTE_INCONSISTENT",
            Self::Settings(err) => err.error_code(),
        }
    }
}
