//! Settings access for the control plane.
//!
//! Components never read global state; they are handed a `SettingsProvider`.
//! Caching is the provider's concern and is invalidated explicitly.

pub mod cache;
pub mod error;
pub mod provider;

pub use cache::CachedSettings;
pub use error::SettingsError;
pub use provider::{SettingsProvider, StaticSettings};
