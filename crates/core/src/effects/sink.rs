//! Collaborator interfaces and side-effect dispatch.
//!
//! The engine only declares effects. Hosts implement these traits over
//! their inventory, party ledger and journal, and run `EffectSink::dispatch`
//! inside the same unit of work that persists the new document state.

use thiserror::Error;

use super::types::{BalancePosting, SideEffect, StockMovement, TransactionRecord};

/// A collaborator refused or failed to apply a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{collaborator} rejected {effect}: {message}")]
pub struct CollaboratorError {
    /// `inventory`, `party_ledger` or `journal`.
    pub collaborator: &'static str,
    /// The effect kind that failed.
    pub effect: &'static str,
    /// Collaborator-supplied detail.
    pub message: String,
}

impl From<CollaboratorError> for karat_shared::AppError {
    fn from(err: CollaboratorError) -> Self {
        Self::ExternalService(err.to_string())
    }
}

/// Stock movement ledger.
pub trait InventoryStore {
    /// Applies a stock movement.
    fn apply_stock_movement(&mut self, movement: &StockMovement) -> Result<(), CollaboratorError>;
}

/// Money and gold balances per counterparty.
pub trait PartyLedger {
    /// Posts a balance change.
    fn post_balance(&mut self, posting: &BalancePosting) -> Result<(), CollaboratorError>;
}

/// Money transactions against business accounts.
pub trait TransactionJournal {
    /// Records a transaction.
    fn record_transaction(&mut self, record: &TransactionRecord) -> Result<(), CollaboratorError>;
}

/// Routes side effects to the three collaborators.
pub struct EffectSink<'a, I, L, J> {
    inventory: &'a mut I,
    ledger: &'a mut L,
    journal: &'a mut J,
}

impl<'a, I, L, J> EffectSink<'a, I, L, J>
where
    I: InventoryStore,
    L: PartyLedger,
    J: TransactionJournal,
{
    /// Creates a sink over the given collaborators.
    pub fn new(inventory: &'a mut I, ledger: &'a mut L, journal: &'a mut J) -> Self {
        Self {
            inventory,
            ledger,
            journal,
        }
    }

    /// Executes `effects` in order and returns how many reached a collaborator.
    ///
    /// `LockDocument` is a persistence concern and is skipped here. Stops at
    /// the first failure; the host is expected to roll back its unit of work.
    pub fn dispatch(&mut self, effects: &[SideEffect]) -> Result<usize, CollaboratorError> {
        let mut applied = 0;
        for effect in effects {
            match effect {
                SideEffect::StockMovement(movement) => {
                    self.inventory.apply_stock_movement(movement)?;
                }
                SideEffect::BalancePosting(posting) => self.ledger.post_balance(posting)?,
                SideEffect::Transaction(record) => self.journal.record_transaction(record)?,
                SideEffect::LockDocument { .. } => continue,
            }
            applied += 1;
        }
        Ok(applied)
    }
}
