//! Core business logic for Karat.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `valuation` - Metal value, making charges, VAT, discount and grand totals
//! - `lifecycle` - Job card, invoice and purchase state machine
//! - `returns` - Remaining-balance tracking and refund settlement for returns
//! - `effects` - Side-effect commands and the collaborator interfaces that consume them
//! - `error` - Error classification shared by all modules

pub mod effects;
pub mod error;
pub mod lifecycle;
pub mod returns;
pub mod valuation;

pub use error::ErrorCategory;
