//! Approval routing domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use spendline_shared::types::Amount;

/// Number of approval levels a route can carry.
pub const APPROVAL_LEVELS: u8 = 3;

/// The approver identity for one route level.
///
/// When both role and user are set, the actor must satisfy both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelApprover {
    /// Role the approver must hold.
    pub role: Option<String>,
    /// Exact user who must approve.
    pub user: Option<String>,
}

impl LevelApprover {
    /// Creates an approver constrained by role.
    #[must_use]
    pub fn role(role: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            user: None,
        }
    }

    /// Creates an approver constrained by user.
    #[must_use]
    pub fn user(user: &str) -> Self {
        Self {
            role: None,
            user: Some(user.to_string()),
        }
    }

    /// Returns true if a role or a user is set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.role.is_some() || self.user.is_some()
    }
}

/// One level of an approval line, optionally narrowed to its own bracket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineLevel {
    /// Approver for this level.
    pub approver: LevelApprover,
    /// Level-specific lower bound (inclusive); the line bound applies when unset.
    pub min_amount: Option<Decimal>,
    /// Level-specific upper bound (inclusive); the line bound applies when unset.
    pub max_amount: Option<Decimal>,
}

impl LineLevel {
    /// Creates a level with no bracket of its own.
    #[must_use]
    pub fn new(approver: LevelApprover) -> Self {
        Self {
            approver,
            min_amount: None,
            max_amount: None,
        }
    }

    /// Narrows this level to its own bracket.
    #[must_use]
    pub fn bracket(mut self, min: Decimal, max: Option<Decimal>) -> Self {
        self.min_amount = Some(min);
        self.max_amount = max;
        self
    }

    /// Returns true if this level applies to `amount`.
    #[must_use]
    pub fn applies_to(&self, amount: Decimal) -> bool {
        let min = self.min_amount.unwrap_or(Decimal::ZERO);
        match self.max_amount {
            Some(max) => Amount::within(amount, min, max),
            None if self.min_amount.is_some() => Amount::covers(amount, min),
            None => true,
        }
    }
}

/// A bracketed line of an approval setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLine {
    /// Expense account this line applies to; `None` for the default line.
    pub account: Option<String>,
    /// Whether this line is the fallback for accounts without their own line.
    pub is_default: bool,
    /// Lower bound of the bracket (inclusive).
    pub min_amount: Decimal,
    /// Upper bound of the bracket (inclusive); `None` means unbounded.
    pub max_amount: Option<Decimal>,
    /// Levels 1 to 3.
    pub levels: [LineLevel; 3],
}

impl ApprovalLine {
    /// Creates a line for a specific account.
    #[must_use]
    pub fn for_account(account: &str, min: Decimal, max: Option<Decimal>) -> Self {
        Self {
            account: Some(account.to_string()),
            is_default: false,
            min_amount: min,
            max_amount: max,
            levels: Default::default(),
        }
    }

    /// Creates a default line.
    #[must_use]
    pub fn default_line(min: Decimal, max: Option<Decimal>) -> Self {
        Self {
            account: None,
            is_default: true,
            min_amount: min,
            max_amount: max,
            levels: Default::default(),
        }
    }

    /// Sets a level (1-based). Levels outside 1..=3 are ignored.
    #[must_use]
    pub fn level(mut self, level: u8, line_level: LineLevel) -> Self {
        if let Some(slot) = level
            .checked_sub(1)
            .and_then(|idx| self.levels.get_mut(usize::from(idx)))
        {
            *slot = line_level;
        }
        self
    }

    /// Returns true if the bracket contains `amount`.
    #[must_use]
    pub fn contains(&self, amount: Decimal) -> bool {
        match self.max_amount {
            Some(max) => Amount::within(amount, self.min_amount, max),
            None => Amount::covers(amount, self.min_amount),
        }
    }

    /// Returns the route this line yields for `amount`.
    ///
    /// Levels whose own bracket excludes the amount are emptied.
    #[must_use]
    pub fn route_for(&self, amount: Decimal) -> ApprovalRoute {
        let levels = self.levels.clone().map(|level| {
            if level.applies_to(amount) {
                level.approver
            } else {
                LevelApprover::default()
            }
        });
        ApprovalRoute { levels }
    }
}

/// The approval configuration bound to one cost center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSetting {
    /// Setting name.
    pub name: String,
    /// Cost center this setting is bound to.
    pub cost_center: String,
    /// Whether this setting is active.
    pub is_active: bool,
    /// Last-modified timestamp, compared against route snapshots.
    pub modified: DateTime<Utc>,
    /// Bracketed lines.
    pub lines: Vec<ApprovalLine>,
}

impl ApprovalSetting {
    /// Creates an active setting with no lines.
    #[must_use]
    pub fn new(name: &str, cost_center: &str) -> Self {
        Self {
            name: name.to_string(),
            cost_center: cost_center.to_string(),
            is_active: true,
            modified: Utc::now(),
            lines: Vec::new(),
        }
    }

    /// Adds a line.
    #[must_use]
    pub fn with_line(mut self, line: ApprovalLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Returns the identity of this setting version.
    #[must_use]
    pub fn stamp(&self) -> SettingStamp {
        SettingStamp {
            name: self.name.clone(),
            modified: self.modified,
        }
    }
}

/// Identifies the version of a setting a route was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingStamp {
    /// Setting name.
    pub name: String,
    /// Last-modified timestamp at resolution time.
    pub modified: DateTime<Utc>,
}

/// A resolved three-level approval route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalRoute {
    /// Levels 1 to 3.
    pub levels: [LevelApprover; 3],
}

impl ApprovalRoute {
    /// Creates a route from three levels.
    #[must_use]
    pub fn new(level1: LevelApprover, level2: LevelApprover, level3: LevelApprover) -> Self {
        Self {
            levels: [level1, level2, level3],
        }
    }

    /// The canonical empty route (auto-approve).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no level is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.levels.iter().any(LevelApprover::is_configured)
    }

    /// Returns the approver for a 1-based level.
    #[must_use]
    pub fn level(&self, level: u8) -> Option<&LevelApprover> {
        level
            .checked_sub(1)
            .and_then(|idx| self.levels.get(usize::from(idx)))
    }

    /// Returns true if the 1-based level has a role or user.
    #[must_use]
    pub fn is_level_configured(&self, level: u8) -> bool {
        self.level(level).is_some_and(LevelApprover::is_configured)
    }

    /// Returns the first configured level.
    #[must_use]
    pub fn first_level(&self) -> Option<u8> {
        (1..=APPROVAL_LEVELS).find(|l| self.is_level_configured(*l))
    }

    /// Returns the next configured level after `level`.
    #[must_use]
    pub fn next_level_after(&self, level: u8) -> Option<u8> {
        (level.saturating_add(1)..=APPROVAL_LEVELS).find(|l| self.is_level_configured(*l))
    }
}

/// Outcome of route resolution.
///
/// Missing configuration is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResolution {
    /// A setting was found; the route may still be empty.
    Route {
        /// The resolved route.
        route: ApprovalRoute,
        /// The setting version it was resolved from.
        setting: SettingStamp,
    },
    /// No active setting is bound to the cost center.
    ConfigMissing {
        /// The cost center that has no setting.
        cost_center: String,
    },
}

impl RouteResolution {
    /// Returns the resolved route; empty when configuration is missing.
    #[must_use]
    pub fn route(&self) -> ApprovalRoute {
        match self {
            Self::Route { route, .. } => route.clone(),
            Self::ConfigMissing { .. } => ApprovalRoute::empty(),
        }
    }

    /// Returns true if the request should be auto-approved.
    #[must_use]
    pub fn is_auto_approve(&self) -> bool {
        match self {
            Self::Route { route, .. } => route.is_empty(),
            Self::ConfigMissing { .. } => true,
        }
    }

    /// Captures the resolution as a snapshot to store on the request.
    #[must_use]
    pub fn snapshot(&self, captured_at: DateTime<Utc>) -> Option<RouteSnapshot> {
        match self {
            Self::Route { route, setting } => Some(RouteSnapshot {
                setting: setting.clone(),
                route: route.clone(),
                captured_at,
            }),
            Self::ConfigMissing { .. } => None,
        }
    }
}

/// A route captured on a request for staleness checks and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSnapshot {
    /// The setting version the route was resolved from.
    pub setting: SettingStamp,
    /// The route itself.
    pub route: ApprovalRoute,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

impl RouteSnapshot {
    /// Returns true if `current` is a newer or different setting.
    #[must_use]
    pub fn is_stale_against(&self, current: &ApprovalSetting) -> bool {
        self.setting.name != current.name || current.modified > self.setting.modified
    }
}
