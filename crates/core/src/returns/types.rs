//! Returns domain types.

use chrono::{DateTime, Utc};
use karat_shared::types::{AccountId, DocumentId, LineItemId, PartyId, ReturnId, ReturnItemId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::effects::PaymentMode;
use crate::lifecycle::DocumentKind;

/// Direction of a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    /// A customer brings back goods from a sale.
    SaleReturn,
    /// The business sends goods back to a vendor.
    PurchaseReturn,
}

impl ReturnType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaleReturn => "sale_return",
            Self::PurchaseReturn => "purchase_return",
        }
    }

    /// Reference type a document-linked return of this type must carry.
    #[must_use]
    pub fn document_reference(&self) -> ReferenceType {
        match self {
            Self::SaleReturn => ReferenceType::Invoice,
            Self::PurchaseReturn => ReferenceType::Purchase,
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a return refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// A finalized invoice.
    Invoice,
    /// A finalized purchase.
    Purchase,
    /// No source document.
    Manual,
}

impl ReferenceType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Purchase => "purchase",
            Self::Manual => "manual",
        }
    }

    /// Document kind a reference of this type points at.
    #[must_use]
    pub fn document_kind(&self) -> Option<DocumentKind> {
        match self {
            Self::Invoice => Some(DocumentKind::Invoice),
            Self::Purchase => Some(DocumentKind::Purchase),
            Self::Manual => None,
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference from a return to its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnReference {
    /// Invoice, purchase or manual.
    pub reference_type: ReferenceType,
    /// The source document, unless manual.
    #[serde(default)]
    pub document_id: Option<DocumentId>,
}

impl ReturnReference {
    /// Reference to a finalized invoice.
    #[must_use]
    pub fn invoice(document_id: DocumentId) -> Self {
        Self {
            reference_type: ReferenceType::Invoice,
            document_id: Some(document_id),
        }
    }

    /// Reference to a finalized purchase.
    #[must_use]
    pub fn purchase(document_id: DocumentId) -> Self {
        Self {
            reference_type: ReferenceType::Purchase,
            document_id: Some(document_id),
        }
    }

    /// A return with no source document.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            reference_type: ReferenceType::Manual,
            document_id: None,
        }
    }
}

/// Return status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    /// Editable; reserves remaining balance.
    Draft,
    /// Settled and immutable.
    Finalized,
}

impl ReturnStatus {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a return item is tied to a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrigin {
    /// Populated from a source line; capped by its remaining balance.
    SourceLinked,
    /// Entered by hand; not capped.
    Manual,
}

/// A line on a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    /// Item identifier.
    pub id: ReturnItemId,
    /// Source line, for source-linked items.
    #[serde(default)]
    pub source_item_id: Option<LineItemId>,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Pieces returned.
    pub qty: u32,
    /// Weight returned, in grams.
    pub weight_grams: Decimal,
    /// Money value of the returned goods.
    pub amount: Decimal,
}

impl ReturnItem {
    /// An item returning part of `source_item_id`.
    #[must_use]
    pub fn linked(source_item_id: LineItemId, qty: u32, weight_grams: Decimal, amount: Decimal) -> Self {
        Self {
            id: ReturnItemId::new(),
            source_item_id: Some(source_item_id),
            description: String::new(),
            qty,
            weight_grams,
            amount,
        }
    }

    /// A hand-entered item.
    #[must_use]
    pub fn manual(description: impl Into<String>, qty: u32, weight_grams: Decimal, amount: Decimal) -> Self {
        Self {
            id: ReturnItemId::new(),
            source_item_id: None,
            description: description.into(),
            qty,
            weight_grams,
            amount,
        }
    }

    /// Derived from whether a source line is set.
    #[must_use]
    pub fn origin(&self) -> ItemOrigin {
        if self.source_item_id.is_some() {
            ItemOrigin::SourceLinked
        } else {
            ItemOrigin::Manual
        }
    }
}

/// How a return is refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMode {
    /// Money to or from an account.
    Money,
    /// Gold against the party's gold balance.
    Gold,
    /// Both legs.
    Mixed,
}

impl RefundMode {
    /// Returns true if a money leg is required.
    #[must_use]
    pub fn has_money_leg(&self) -> bool {
        matches!(self, Self::Money | Self::Mixed)
    }

    /// Returns true if a gold leg is required.
    #[must_use]
    pub fn has_gold_leg(&self) -> bool {
        matches!(self, Self::Gold | Self::Mixed)
    }
}

/// Refund fields; only required at finalize time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundDetails {
    /// Refund mode.
    #[serde(default)]
    pub mode: Option<RefundMode>,
    /// Money leg amount.
    #[serde(default)]
    pub money_amount: Decimal,
    /// Account the money leg goes through.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// How the money leg is paid.
    #[serde(default)]
    pub payment_mode: PaymentMode,
    /// Gold leg weight in grams.
    #[serde(default)]
    pub gold_grams: Decimal,
    /// Gold leg fineness.
    #[serde(default)]
    pub gold_purity: Option<u16>,
}

impl RefundDetails {
    /// Money-only refund through `account_id`.
    #[must_use]
    pub fn money(amount: Decimal, account_id: AccountId) -> Self {
        Self {
            mode: Some(RefundMode::Money),
            money_amount: amount,
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    /// Gold-only refund.
    #[must_use]
    pub fn gold(grams: Decimal, purity: u16) -> Self {
        Self {
            mode: Some(RefundMode::Gold),
            gold_grams: grams,
            gold_purity: Some(purity),
            ..Self::default()
        }
    }
}

/// A sale or purchase return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Return {
    /// Return identifier.
    pub id: ReturnId,
    /// Sale or purchase return.
    pub return_type: ReturnType,
    /// Source reference.
    pub reference: ReturnReference,
    /// Customer or vendor.
    pub party_id: PartyId,
    /// Draft or finalized.
    pub status: ReturnStatus,
    /// Items returned.
    pub items: Vec<ReturnItem>,
    /// Refund settlement fields.
    #[serde(default)]
    pub refund: RefundDetails,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Finalization time.
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
    /// User who finalized.
    #[serde(default)]
    pub finalized_by: Option<UserId>,
    /// Optimistic concurrency version.
    #[serde(default)]
    pub version: u64,
}

impl Return {
    /// Returns true if this return reserves balance on `document_id`.
    #[must_use]
    pub fn references(&self, document_id: DocumentId) -> bool {
        self.reference.document_id == Some(document_id)
    }

    /// Sums of qty, weight and amount over all items.
    #[must_use]
    pub fn totals(&self) -> ReturnTotals {
        self.items.iter().fold(ReturnTotals::default(), |mut acc, item| {
            acc.qty += u64::from(item.qty);
            acc.weight_grams += item.weight_grams;
            acc.amount += item.amount;
            acc
        })
    }
}

/// Aggregate quantities of a return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReturnTotals {
    /// Pieces.
    pub qty: u64,
    /// Grams.
    pub weight_grams: Decimal,
    /// Money value.
    pub amount: Decimal,
}

/// How much of one source line is still returnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemainingBalance {
    /// The source line.
    pub line_item_id: LineItemId,
    /// Pieces on the source line.
    pub original_qty: i64,
    /// Valued weight of the source line.
    pub original_weight: Decimal,
    /// Line total of the source line.
    pub original_amount: Decimal,
    /// Pieces still returnable; never negative.
    pub qty: i64,
    /// Grams still returnable; never negative.
    pub weight: Decimal,
    /// Money still returnable; never negative.
    pub amount: Decimal,
}
