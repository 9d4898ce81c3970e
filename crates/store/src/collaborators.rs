//! In-memory inventory, party ledger and transaction journal.
//!
//! The store stages a copy of these, dispatches a transition's side effects
//! into the copy and swaps it in only when every effect succeeded.

use std::collections::{HashMap, HashSet};

use karat_core::effects::{
    BalancePosting, CollaboratorError, EffectSink, InventoryStore, PartyLedger, SideEffect,
    StockMovement, TransactionJournal, TransactionRecord, TransactionType,
};
use karat_shared::types::{AccountId, PartyId};
use rust_decimal::Decimal;
use serde::Serialize;

/// Stock on hand at one purity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    /// Pieces.
    pub qty: i64,
    /// Grams.
    pub weight: Decimal,
}

/// Stock levels keyed by booking purity.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    levels: HashMap<u16, StockLevel>,
    movements: Vec<StockMovement>,
}

impl InMemoryInventory {
    /// Stock at `purity`.
    #[must_use]
    pub fn level(&self, purity: u16) -> StockLevel {
        self.levels.get(&purity).copied().unwrap_or_default()
    }

    /// Every applied movement, oldest first.
    #[must_use]
    pub fn movements(&self) -> &[StockMovement] {
        &self.movements
    }
}

impl InventoryStore for InMemoryInventory {
    fn apply_stock_movement(&mut self, movement: &StockMovement) -> Result<(), CollaboratorError> {
        let level = self.levels.entry(movement.purity).or_default();
        level.qty += movement.qty_delta;
        level.weight += movement.weight_delta;
        self.movements.push(movement.clone());
        Ok(())
    }
}

/// Money and gold balance of one party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartyBalance {
    /// Positive when the party owes the business money.
    pub money: Decimal,
    /// Positive when the party owes the business gold, in grams.
    pub gold: Decimal,
}

/// Party balances.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPartyLedger {
    balances: HashMap<PartyId, PartyBalance>,
    postings: Vec<BalancePosting>,
    frozen: HashSet<PartyId>,
}

impl InMemoryPartyLedger {
    /// Balance of `party_id`.
    #[must_use]
    pub fn balance(&self, party_id: PartyId) -> PartyBalance {
        self.balances.get(&party_id).copied().unwrap_or_default()
    }

    /// Every accepted posting, oldest first.
    #[must_use]
    pub fn postings(&self) -> &[BalancePosting] {
        &self.postings
    }

    /// Rejects further postings for `party_id`.
    pub fn freeze(&mut self, party_id: PartyId) {
        self.frozen.insert(party_id);
    }
}

impl PartyLedger for InMemoryPartyLedger {
    fn post_balance(&mut self, posting: &BalancePosting) -> Result<(), CollaboratorError> {
        if self.frozen.contains(&posting.party_id) {
            return Err(CollaboratorError {
                collaborator: "party_ledger",
                effect: "balance_posting",
                message: format!("party {} is frozen", posting.party_id),
            });
        }
        let balance = self.balances.entry(posting.party_id).or_default();
        balance.money += posting.money_delta;
        balance.gold += posting.gold_delta;
        self.postings.push(posting.clone());
        Ok(())
    }
}

/// Account balances and the transaction log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJournal {
    accounts: HashMap<AccountId, Decimal>,
    records: Vec<TransactionRecord>,
}

impl InMemoryJournal {
    /// Net of credits minus debits on `account_id`.
    #[must_use]
    pub fn account_balance(&self, account_id: AccountId) -> Decimal {
        self.accounts.get(&account_id).copied().unwrap_or_default()
    }

    /// Every recorded transaction, oldest first.
    #[must_use]
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }
}

impl TransactionJournal for InMemoryJournal {
    fn record_transaction(&mut self, record: &TransactionRecord) -> Result<(), CollaboratorError> {
        if record.amount <= Decimal::ZERO {
            return Err(CollaboratorError {
                collaborator: "journal",
                effect: "transaction",
                message: format!("amount must be positive, got {}", record.amount),
            });
        }
        let balance = self.accounts.entry(record.account_id).or_default();
        match record.transaction_type {
            TransactionType::Credit => *balance += record.amount,
            TransactionType::Debit => *balance -= record.amount,
        }
        self.records.push(record.clone());
        Ok(())
    }
}

/// The three collaborators behind one unit of work.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollaborators {
    /// Stock ledger.
    pub inventory: InMemoryInventory,
    /// Party balances.
    pub ledger: InMemoryPartyLedger,
    /// Money transactions.
    pub journal: InMemoryJournal,
}

impl InMemoryCollaborators {
    /// Applies `effects` all-or-nothing and returns how many reached a collaborator.
    pub fn apply_atomically(&mut self, effects: &[SideEffect]) -> Result<usize, CollaboratorError> {
        let mut staged = self.clone();
        let applied = EffectSink::new(&mut staged.inventory, &mut staged.ledger, &mut staged.journal)
            .dispatch(effects)?;
        *self = staged;
        Ok(applied)
    }
}
