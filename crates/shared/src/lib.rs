//! Shared types, errors, and configuration for Spendline.
//!
//! This crate provides common types used across all other crates:
//! - Amount helpers with the half-minor-unit comparison tolerance
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management (feature flags and control settings)

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ControlSettings, DimensionMode, EnforceMode, LoggingConfig};
pub use error::{AppError, AppResult};
