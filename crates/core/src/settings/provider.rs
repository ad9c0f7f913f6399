//! Settings provider trait and the in-memory provider.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use spendline_shared::ControlSettings;

use super::error::SettingsError;
use crate::routing::ApprovalSetting;

/// Source of control settings and approval settings.
pub trait SettingsProvider: Send + Sync {
    /// Returns the control settings; defaults when nothing is configured.
    fn control_settings(&self) -> ControlSettings;

    /// Returns the active approval setting bound to a cost center.
    fn active_approval_setting(
        &self,
        cost_center: &str,
    ) -> Result<Option<ApprovalSetting>, SettingsError>;

    /// Drops any cached values. Providers without a cache ignore this.
    fn invalidate(&self) {}
}

/// Settings held in memory and edited by the integration layer.
#[derive(Debug, Default)]
pub struct StaticSettings {
    control: RwLock<ControlSettings>,
    approvals: RwLock<HashMap<String, ApprovalSetting>>,
}

impl StaticSettings {
    /// Creates a provider with the given control settings.
    #[must_use]
    pub fn new(control: ControlSettings) -> Self {
        Self {
            control: RwLock::new(control),
            approvals: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the control settings.
    pub fn set_control(&self, control: ControlSettings) {
        if let Ok(mut guard) = self.control.write() {
            *guard = control;
        }
    }

    /// Stores an approval setting as-is, keyed by its cost center.
    pub fn put_approval_setting(&self, setting: ApprovalSetting) {
        if let Ok(mut guard) = self.approvals.write() {
            guard.insert(setting.cost_center.clone(), setting);
        }
    }

    /// Stores an edited approval setting, advancing its modified timestamp.
    ///
    /// The new timestamp is strictly later than the stored one so that
    /// route snapshots taken against the old version become stale.
    pub fn replace_approval_setting(&self, mut setting: ApprovalSetting) {
        if let Ok(mut guard) = self.approvals.write() {
            let floor = guard
                .get(&setting.cost_center)
                .map(|previous| previous.modified + Duration::milliseconds(1));
            let now = Utc::now();
            setting.modified = floor.map_or(now, |floor| floor.max(now));
            guard.insert(setting.cost_center.clone(), setting);
        }
    }

    /// Removes the approval setting bound to a cost center.
    pub fn remove_approval_setting(&self, cost_center: &str) {
        if let Ok(mut guard) = self.approvals.write() {
            guard.remove(cost_center);
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn control_settings(&self) -> ControlSettings {
        self.control
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn active_approval_setting(
        &self,
        cost_center: &str,
    ) -> Result<Option<ApprovalSetting>, SettingsError> {
        let guard = self
            .approvals
            .read()
            .map_err(|_| SettingsError::Unavailable("approval settings lock poisoned".into()))?;
        Ok(guard
            .get(cost_center)
            .filter(|setting| setting.is_active)
            .cloned())
    }
}

impl<P: SettingsProvider + ?Sized> SettingsProvider for Arc<P> {
    fn control_settings(&self) -> ControlSettings {
        (**self).control_settings()
    }

    fn active_approval_setting(
        &self,
        cost_center: &str,
    ) -> Result<Option<ApprovalSetting>, SettingsError> {
        (**self).active_approval_setting(cost_center)
    }

    fn invalidate(&self) {
        (**self).invalidate();
    }
}
