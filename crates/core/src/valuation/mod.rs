//! Valuation of job cards, invoices and purchases.
//!
//! Pure functions from line items, metal rate, discount and round-off to
//! line and document totals. No side effects, no I/O.
//!
//! # Modules
//!
//! - `types` - Line items and valuation results
//! - `error` - Valuation input errors
//! - `engine` - The calculator

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::ValuationEngine;
pub use error::ValuationError;
pub use types::{DocumentValuation, LineItem, LineValuation, MakingChargeType};

/// Fineness at which gold moves through stock, whatever purity the
/// counterparty declared.
///
/// Fixed business rule: purchased gold is always booked into inventory as
/// 22K (916). It is deliberately not configurable. Stock movements carry the
/// entered purity alongside it.
pub const STANDARD_VALUATION_PURITY: u16 = 916;
