//! Multi-level approval routing.
//!
//! Maps a (cost center, account set, amount) triple to an ordered route of
//! up to three approver levels, using the bracketed lines of the active
//! approval setting for the cost center.
//!
//! # Modules
//!
//! - `types` - Settings, lines, routes and route snapshots
//! - `resolver` - Bracket matching and cross-account consistency
//! - `error` - Routing error types

pub mod error;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod resolver_props;

pub use error::RoutingError;
pub use resolver::ApprovalRouteResolver;
pub use types::{
    APPROVAL_LEVELS, ApprovalLine, ApprovalRoute, ApprovalSetting, LevelApprover, LineLevel,
    RouteResolution, RouteSnapshot, SettingStamp,
};
