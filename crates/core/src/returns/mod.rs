//! Sale and purchase returns.
//!
//! Tracks how much of each source line remains returnable, validates
//! requested items against it and settles refunds in money, gold or both.
//!
//! # Modules
//!
//! - `types` - Returns, items, references, refund fields, balances
//! - `error` - Rejections and settlement errors
//! - `balance` - Remaining balance and item validation
//! - `settlement` - Draft management and finalization

pub mod balance;
pub mod error;
pub mod settlement;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::{compute_remaining, validate_item_values, validate_return_items};
pub use error::{RefundField, RejectedItem, RejectionReason, ReturnsError};
pub use settlement::{NewReturn, ReturnFinalization, ReturnsLedger, Settlement};
pub use types::{
    ItemOrigin, ReferenceType, RefundDetails, RefundMode, RemainingBalance, Return, ReturnItem,
    ReturnReference, ReturnStatus, ReturnTotals, ReturnType,
};
