//! Shared identifiers, precision rules, errors, and configuration for Karat.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe document, party, and account references
//! - Decimal precision and rounding rules for money and gold weights
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
