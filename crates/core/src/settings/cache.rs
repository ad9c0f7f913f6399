//! Approval setting caching using Moka.
//!
//! Wraps any provider and memoizes approval-setting lookups per cost
//! center. Entries live until `invalidate` is called or the TTL expires.

use std::time::Duration;

use moka::sync::Cache;
use spendline_shared::ControlSettings;

use super::error::SettingsError;
use super::provider::SettingsProvider;
use crate::routing::ApprovalSetting;

/// Default cache capacity (number of cost centers).
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// A caching decorator over a settings provider.
pub struct CachedSettings<P> {
    inner: P,
    approvals: Cache<String, Option<ApprovalSetting>>,
}

impl<P: SettingsProvider> CachedSettings<P> {
    /// Wraps a provider with default capacity and TTL.
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self::with_config(inner, DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Wraps a provider with custom capacity and TTL.
    #[must_use]
    pub fn with_config(inner: P, max_capacity: u64, ttl_secs: u64) -> Self {
        let approvals = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { inner, approvals }
    }

    /// Returns the wrapped provider.
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drops the cached entry for one cost center.
    pub fn invalidate_cost_center(&self, cost_center: &str) {
        self.approvals.invalidate(cost_center);
    }
}

impl<P: SettingsProvider> SettingsProvider for CachedSettings<P> {
    fn control_settings(&self) -> ControlSettings {
        self.inner.control_settings()
    }

    fn active_approval_setting(
        &self,
        cost_center: &str,
    ) -> Result<Option<ApprovalSetting>, SettingsError> {
        if let Some(cached) = self.approvals.get(cost_center) {
            return Ok(cached);
        }
        let fetched = self.inner.active_approval_setting(cost_center)?;
        self.approvals
            .insert(cost_center.to_string(), fetched.clone());
        Ok(fetched)
    }

    fn invalidate(&self) {
        self.approvals.invalidate_all();
        self.inner.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::StaticSettings;

    #[test]
    fn test_serves_cached_value_until_invalidated() {
        let cached = CachedSettings::new(StaticSettings::default());
        cached
            .inner()
            .put_approval_setting(ApprovalSetting::new("S1", "CC"));

        let first = cached.active_approval_setting("CC").unwrap().unwrap();
        assert_eq!(first.name, "S1");

        cached
            .inner()
            .replace_approval_setting(ApprovalSetting::new("S2", "CC"));
        let still_cached = cached.active_approval_setting("CC").unwrap().unwrap();
        assert_eq!(still_cached.name, "S1");

        cached.invalidate();
        let refreshed = cached.active_approval_setting("CC").unwrap().unwrap();
        assert_eq!(refreshed.name, "S2");
    }

    #[test]
    fn test_caches_absence() {
        let cached = CachedSettings::new(StaticSettings::default());
        assert_eq!(cached.active_approval_setting("CC").unwrap(), None);

        cached
            .inner()
            .put_approval_setting(ApprovalSetting::new("S1", "CC"));
        assert_eq!(cached.active_approval_setting("CC").unwrap(), None);

        cached.invalidate_cost_center("CC");
        assert!(cached.active_approval_setting("CC").unwrap().is_some());
    }
}
