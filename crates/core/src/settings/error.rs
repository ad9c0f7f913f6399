//! Settings error types.

use thiserror::Error;

/// Errors raised by a settings provider.
///
/// Absent configuration is not an error; providers return defaults or `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The configuration store could not be read.
    #[error("Settings unavailable: {0}")]
    Unavailable(String),
}

impl SettingsError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "SETTINGS_UNAVAILABLE",
        }
    }
}
