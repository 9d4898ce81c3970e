//! Side-effect commands and the collaborators that execute them.
//!
//! # Modules
//!
//! - `types` - Stock movements, balance postings, transaction records
//! - `sink` - Collaborator traits and ordered dispatch

pub mod sink;
pub mod types;

pub use sink::{CollaboratorError, EffectSink, InventoryStore, PartyLedger, TransactionJournal};
pub use types::{
    BalancePosting, PaymentMode, PostingReason, SideEffect, SourceRef, StockMovement,
    StockMovementType, TransactionRecord, TransactionType,
};
