//! Lifecycle domain types for job cards, invoices and purchases.

use chrono::{DateTime, Utc};
use karat_shared::types::{DocumentId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of document a lifecycle governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Workshop order for making or repairing jewellery.
    JobCard,
    /// Sale to a customer.
    Invoice,
    /// Purchase from a vendor.
    Purchase,
}

impl DocumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobCard => "job_card",
            Self::Invoice => "invoice",
            Self::Purchase => "purchase",
        }
    }

    /// Returns true for kinds that finalize and take payments.
    #[must_use]
    pub fn is_financial(&self) -> bool {
        matches!(self, Self::Invoice | Self::Purchase)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Document status.
///
/// Valid transitions by kind:
/// - Invoice / Purchase: Draft → Finalized
/// - Job card: Draft → InProgress → Completed → Delivered, and
///   Draft | InProgress | Completed → Cancelled
/// - Any kind: Draft → Removed (deletion)
///
/// A job card's draft state is what the workshop calls "created".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Being drafted; freely editable.
    Draft,
    /// Job card work has started.
    InProgress,
    /// Job card work is finished, awaiting delivery.
    Completed,
    /// Job card handed over to the customer (terminal).
    Delivered,
    /// Invoice or purchase finalized and locked (terminal, still payable).
    Finalized,
    /// Job card cancelled (terminal).
    Cancelled,
    /// Deleted while draft (terminal pseudo-state).
    Removed,
}

impl DocumentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Delivered => "delivered",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
            Self::Removed => "removed",
        }
    }

    /// Parses a status from a string. `created` is accepted for drafts.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" | "created" => Some(Self::Draft),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "delivered" => Some(Self::Delivered),
            "finalized" => Some(Self::Finalized),
            "cancelled" => Some(Self::Cancelled),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }

    /// Returns true if no further transition exists.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Finalized | Self::Cancelled | Self::Removed
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An operation requested on a document, used in rejection messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// Draft → Finalized.
    Finalize,
    /// Draft → InProgress.
    Start,
    /// InProgress → Completed.
    Complete,
    /// Completed → Delivered.
    Deliver,
    /// Non-terminal → Cancelled.
    Cancel,
    /// Draft → Removed.
    Delete,
    /// Job card → invoice.
    Convert,
    /// Structural edit of line items or pricing.
    Edit,
    /// Payment against the balance due.
    ApplyPayment,
}

impl LifecycleAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finalize => "finalize",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Deliver => "deliver",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
            Self::Convert => "convert",
            Self::Edit => "edit",
            Self::ApplyPayment => "apply payment to",
        }
    }

    /// The status a successful action leads to, when it changes status.
    #[must_use]
    pub fn target_status(&self) -> Option<DocumentStatus> {
        match self {
            Self::Finalize => Some(DocumentStatus::Finalized),
            Self::Start => Some(DocumentStatus::InProgress),
            Self::Complete => Some(DocumentStatus::Completed),
            Self::Deliver => Some(DocumentStatus::Delivered),
            Self::Cancel => Some(DocumentStatus::Cancelled),
            Self::Delete => Some(DocumentStatus::Removed),
            Self::Convert | Self::Edit | Self::ApplyPayment => None,
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of an invoice or purchase, derived from paid vs grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing paid and something due.
    Unpaid,
    /// Something paid, something still due.
    Partial,
    /// Nothing due.
    Paid,
}

impl PaymentStatus {
    /// Derives the status from the amounts.
    #[must_use]
    pub fn derive(grand_total: Decimal, paid_amount: Decimal) -> Self {
        if grand_total - paid_amount <= Decimal::ZERO {
            Self::Paid
        } else if paid_amount <= Decimal::ZERO {
            Self::Unpaid
        } else {
            Self::Partial
        }
    }

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment snapshot of the invoice a job card was converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedInvoice {
    /// The invoice.
    pub invoice_id: DocumentId,
    /// Its grand total.
    pub grand_total: Decimal,
    /// Amount paid so far.
    pub paid_amount: Decimal,
    /// Status of the invoice.
    pub status: DocumentStatus,
}

impl LinkedInvoice {
    /// Outstanding amount; never negative.
    #[must_use]
    pub fn balance_due(&self) -> Decimal {
        (self.grand_total - self.paid_amount).max(Decimal::ZERO)
    }

    /// Derived payment status.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::derive(self.grand_total, self.paid_amount)
    }
}

/// Caller-supplied context for a transition.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    /// The user performing the transition.
    pub actor: UserId,
    /// When the transition happens.
    pub now: DateTime<Utc>,
    /// Required for job card delivery: the converted invoice's payment state.
    pub linked_invoice: Option<LinkedInvoice>,
}

impl TransitionContext {
    /// Context for `actor` at the current time, without a linked invoice.
    #[must_use]
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            now: Utc::now(),
            linked_invoice: None,
        }
    }

    /// Attaches the linked invoice snapshot.
    #[must_use]
    pub fn with_linked_invoice(mut self, invoice: LinkedInvoice) -> Self {
        self.linked_invoice = Some(invoice);
        self
    }
}
