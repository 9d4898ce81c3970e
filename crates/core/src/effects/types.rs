//! Side-effect commands emitted by lifecycle and returns transitions.
//!
//! Transitions never call collaborators. They return these commands and the
//! host executes them, together with persisting the new state, in one
//! atomic unit.
//!
//! Sign convention for party balances: a positive delta means the party
//! owes the business more; a negative delta means the business owes the
//! party more (or the party owes less).

use karat_shared::types::{AccountId, DocumentId, LineItemId, PartyId, ReturnId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The record a side effect originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SourceRef {
    /// A job card, invoice or purchase.
    Document(DocumentId),
    /// A sale or purchase return.
    Return(ReturnId),
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document(id) => write!(f, "document:{id}"),
            Self::Return(id) => write!(f, "return:{id}"),
        }
    }
}

/// Why stock moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockMovementType {
    /// Gold bought from a vendor enters stock.
    PurchaseIn,
    /// Goods sold on an invoice leave stock.
    SaleOut,
    /// Goods returned by a customer re-enter stock.
    SaleReturnIn,
}

/// A stock movement for the Inventory Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Why stock moves.
    pub movement_type: StockMovementType,
    /// Header record (document or return).
    pub header: SourceRef,
    /// Source line, when the movement is per line.
    pub line_item_id: Option<LineItemId>,
    /// Signed piece count.
    pub qty_delta: i64,
    /// Signed weight in grams.
    pub weight_delta: Decimal,
    /// Purity the stock is booked at.
    pub purity: u16,
    /// Purity entered on the document line.
    pub entered_purity: u16,
}

/// Why a party balance moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingReason {
    /// Unpaid balance of a finalized invoice.
    InvoiceReceivable,
    /// Unpaid balance of a finalized purchase.
    PurchasePayable,
    /// Payment applied to a finalized invoice or purchase.
    PaymentApplied,
    /// Gold leg of a return refund.
    ReturnGoldRefund,
}

/// A balance posting for the Party Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePosting {
    /// Counterparty whose balance moves.
    pub party_id: PartyId,
    /// Signed money delta.
    pub money_delta: Decimal,
    /// Signed gold delta in grams.
    pub gold_delta: Decimal,
    /// Originating record.
    pub reference: SourceRef,
    /// Why the balance moves.
    pub reason: PostingReason,
}

/// How money changes hands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Cash drawer.
    #[default]
    Cash,
    /// Card terminal.
    Card,
    /// Bank transfer.
    BankTransfer,
    /// Cheque.
    Cheque,
}

/// Direction of a money transaction relative to the business account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money into the account.
    Credit,
    /// Money out of the account.
    Debit,
}

/// A money transaction for the Transaction Journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Counterparty paying or being paid.
    pub party_id: PartyId,
    /// Business account receiving or paying.
    pub account_id: AccountId,
    /// Positive amount.
    pub amount: Decimal,
    /// How the money moved.
    pub mode: PaymentMode,
    /// Direction relative to the account.
    pub transaction_type: TransactionType,
    /// Originating record.
    pub reference: SourceRef,
}

/// A command the host must execute after a successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SideEffect {
    /// Move stock in the Inventory Store.
    StockMovement(StockMovement),
    /// Post to a party's money/gold balance.
    BalancePosting(BalancePosting),
    /// Record a money transaction.
    Transaction(TransactionRecord),
    /// Lock a document against structural edits.
    LockDocument {
        /// Document to lock.
        document_id: DocumentId,
        /// User who finalized it.
        locked_by: UserId,
    },
}

impl SideEffect {
    /// Returns a short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StockMovement(_) => "stock_movement",
            Self::BalancePosting(_) => "balance_posting",
            Self::Transaction(_) => "transaction",
            Self::LockDocument { .. } => "lock_document",
        }
    }
}
