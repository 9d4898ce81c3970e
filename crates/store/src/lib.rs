//! In-memory authoritative store for Karat.
//!
//! Serializes every operation on one document, and on all returns against
//! one source document, behind a per-row lock. Side effects are applied to
//! the collaborators all-or-nothing before the new state is written, so a
//! finalize either fully happens or leaves no trace.
//!
//! # Modules
//!
//! - `backoffice` - Documents, returns and their operations
//! - `collaborators` - In-memory inventory, party ledger and journal
//! - `locks` - Per-row locks
//! - `error` - Store errors

pub mod backoffice;
pub mod collaborators;
pub mod error;
pub mod locks;

pub use backoffice::BackOffice;
pub use backoffice::documents::DraftEdit;
pub use collaborators::{
    InMemoryCollaborators, InMemoryInventory, InMemoryJournal, InMemoryPartyLedger, PartyBalance,
    StockLevel,
};
pub use error::StoreError;
