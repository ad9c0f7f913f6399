//! Application configuration management.
//!
//! Configuration is layered: `config/default`, then `config/{RUN_MODE}`,
//! then environment variables prefixed with `SPENDLINE` (separator `__`).
//! Every field has a default, so a missing file or table yields a fully
//! usable configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Budget control feature flags and workflow settings.
    pub control: ControlSettings,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// When budget availability is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EnforceMode {
    /// Reserve when the request reaches the lock state only.
    #[serde(rename = "Approval Only", alias = "approval_only")]
    ApprovalOnly,
    /// Check availability when the purchase invoice is submitted only.
    #[serde(rename = "PI Submit Only", alias = "pi_submit_only")]
    PiSubmitOnly,
    /// Reserve at the lock state and check again at invoice submit.
    #[default]
    #[serde(rename = "Both", alias = "both")]
    Both,
}

impl EnforceMode {
    /// Returns true if reservations are posted on reaching the lock state.
    #[must_use]
    pub const fn reserves_on_lock(self) -> bool {
        matches!(self, Self::ApprovalOnly | Self::Both)
    }

    /// Returns true if availability is checked on invoice submit.
    #[must_use]
    pub const fn checks_on_invoice(self) -> bool {
        matches!(self, Self::PiSubmitOnly | Self::Both)
    }
}

/// Which optional accounting dimensions take part in the budget key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DimensionMode {
    /// Company, fiscal year, cost center, and account only.
    #[default]
    #[serde(rename = "Native", alias = "native")]
    Native,
    /// Native dimensions plus project.
    #[serde(rename = "Native + Project", alias = "native_project")]
    NativeProject,
    /// Native dimensions plus branch.
    #[serde(rename = "Native + Branch", alias = "native_branch")]
    NativeBranch,
}

impl DimensionMode {
    /// Returns true if project participates in the budget key.
    #[must_use]
    pub const fn includes_project(self) -> bool {
        matches!(self, Self::NativeProject)
    }

    /// Returns true if branch participates in the budget key.
    #[must_use]
    pub const fn includes_branch(self) -> bool {
        matches!(self, Self::NativeBranch)
    }
}

/// Budget control settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Gates RESERVATION, RELEASE, CONSUMPTION and REVERSAL postings.
    pub enable_budget_lock: bool,
    /// Gates RECLASS postings.
    pub enable_budget_reclass: bool,
    /// Gates SUPPLEMENT postings.
    pub enable_additional_budget: bool,
    /// Allows internal-charge redistribution of allocation slices.
    pub enable_internal_charge: bool,
    /// When availability is enforced.
    pub enforce_mode: EnforceMode,
    /// Workflow state whose arrival locks the budget.
    pub lock_on_workflow_state: String,
    /// Which optional dimensions take part in the budget key.
    pub dimension_mode: DimensionMode,
    /// Company used when neither the request nor its cost center names one.
    pub default_company: Option<String>,
    /// Fiscal year used when neither the request nor the user names one.
    pub default_fiscal_year: Option<String>,
    /// Roles allowed to reopen approved or rejected requests.
    pub reopen_roles: Vec<String>,
    /// Roles allowed to exceed the available budget.
    pub overrun_roles: Vec<String>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            enable_budget_lock: true,
            enable_budget_reclass: false,
            enable_additional_budget: false,
            enable_internal_charge: false,
            enforce_mode: EnforceMode::default(),
            lock_on_workflow_state: default_lock_state(),
            dimension_mode: DimensionMode::default(),
            default_company: None,
            default_fiscal_year: None,
            reopen_roles: vec!["System Manager".to_string(), "Accounts Manager".to_string()],
            overrun_roles: vec!["Budget Controller".to_string()],
        }
    }
}

fn default_lock_state() -> String {
    "Approved".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "spendline=debug".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source cannot be parsed.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SPENDLINE").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from a TOML document, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or has mistyped fields.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_configured() {
        let config = AppConfig::from_toml("").unwrap();
        assert!(config.control.enable_budget_lock);
        assert!(!config.control.enable_budget_reclass);
        assert!(!config.control.enable_additional_budget);
        assert_eq!(config.control.enforce_mode, EnforceMode::Both);
        assert_eq!(config.control.lock_on_workflow_state, "Approved");
        assert_eq!(config.control.dimension_mode, DimensionMode::Native);
        assert_eq!(config.logging.filter, "spendline=debug");
    }

    #[test]
    fn test_toml_overrides() {
        let config = AppConfig::from_toml(
            r#"
            [control]
            enable_budget_reclass = true
            enforce_mode = "PI Submit Only"
            dimension_mode = "Native + Branch"
            default_fiscal_year = "2026"
            overrun_roles = ["CFO"]
            "#,
        )
        .unwrap();

        assert!(config.control.enable_budget_reclass);
        assert!(config.control.enable_budget_lock);
        assert_eq!(config.control.enforce_mode, EnforceMode::PiSubmitOnly);
        assert_eq!(config.control.dimension_mode, DimensionMode::NativeBranch);
        assert_eq!(config.control.default_fiscal_year.as_deref(), Some("2026"));
        assert_eq!(config.control.overrun_roles, vec!["CFO".to_string()]);
    }

    #[test]
    fn test_invalid_enforce_mode_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [control]
            enforce_mode = "Sometimes"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("SPENDLINE__CONTROL__ENABLE_BUDGET_LOCK", Some("false")),
                ("SPENDLINE__LOGGING__FILTER", Some("spendline=info")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert!(!config.control.enable_budget_lock);
                assert_eq!(config.logging.filter, "spendline=info");
            },
        );
    }

    #[test]
    fn test_enforce_mode_flags() {
        assert!(EnforceMode::ApprovalOnly.reserves_on_lock());
        assert!(!EnforceMode::ApprovalOnly.checks_on_invoice());
        assert!(!EnforceMode::PiSubmitOnly.reserves_on_lock());
        assert!(EnforceMode::PiSubmitOnly.checks_on_invoice());
        assert!(EnforceMode::Both.reserves_on_lock());
        assert!(EnforceMode::Both.checks_on_invoice());
    }

    #[test]
    fn test_dimension_mode_flags() {
        assert!(!DimensionMode::Native.includes_project());
        assert!(!DimensionMode::Native.includes_branch());
        assert!(DimensionMode::NativeProject.includes_project());
        assert!(DimensionMode::NativeBranch.includes_branch());
    }
}
