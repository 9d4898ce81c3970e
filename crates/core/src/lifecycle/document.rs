//! The document aggregate shared by job cards, invoices and purchases.

use chrono::{DateTime, Utc};
use karat_shared::types::{DocumentId, PartyId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{DocumentKind, DocumentStatus, LinkedInvoice, PaymentStatus};
use crate::valuation::{DocumentValuation, LineItem, ValuationEngine, ValuationError};

/// A job card, invoice or purchase with its line items.
///
/// Persisted and loaded as a whole aggregate. `version` increments on every
/// accepted change and backs optimistic concurrency checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: DocumentId,
    /// Job card, invoice or purchase.
    pub kind: DocumentKind,
    /// Customer (job card, invoice) or vendor (purchase).
    pub party_id: Option<PartyId>,
    /// Current status.
    pub status: DocumentStatus,
    /// Line items.
    pub line_items: Vec<LineItem>,
    /// Metal rate per gram used for valuation.
    pub gold_rate: Decimal,
    /// Document-level discount.
    #[serde(default)]
    pub discount_amount: Decimal,
    /// Signed manual round-off.
    #[serde(default)]
    pub round_off_amount: Option<Decimal>,
    /// Amount paid so far.
    #[serde(default)]
    pub paid_amount: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Finalization time.
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
    /// User who locked the document by finalizing it.
    #[serde(default)]
    pub locked_by: Option<UserId>,
    /// Job cards: the invoice produced by conversion.
    #[serde(default)]
    pub converted_invoice_id: Option<DocumentId>,
    /// Invoices: the job card they were converted from.
    #[serde(default)]
    pub source_job_card_id: Option<DocumentId>,
    /// Optimistic concurrency version.
    #[serde(default)]
    pub version: u64,
}

impl Document {
    /// Creates an empty draft.
    #[must_use]
    pub fn draft(
        kind: DocumentKind,
        party_id: Option<PartyId>,
        gold_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            kind,
            party_id,
            status: DocumentStatus::Draft,
            line_items: Vec::new(),
            gold_rate,
            discount_amount: Decimal::ZERO,
            round_off_amount: None,
            paid_amount: Decimal::ZERO,
            created_at: now,
            finalized_at: None,
            locked_by: None,
            converted_invoice_id: None,
            source_job_card_id: None,
            version: 0,
        }
    }

    /// Appends a line item.
    #[must_use]
    pub fn with_line(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    /// Sets the document discount.
    #[must_use]
    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount_amount = discount;
        self
    }

    /// Sets the round-off adjustment.
    #[must_use]
    pub fn with_round_off(mut self, round_off: Decimal) -> Self {
        self.round_off_amount = Some(round_off);
        self
    }

    /// Values the document at its own rate, discount and round-off.
    pub fn valuation(&self, engine: &ValuationEngine) -> Result<DocumentValuation, ValuationError> {
        engine.compute_document(
            &self.line_items,
            self.gold_rate,
            self.discount_amount,
            self.round_off_amount,
        )
    }

    /// Grand total minus paid amount, never negative.
    pub fn balance_due(&self, engine: &ValuationEngine) -> Result<Decimal, ValuationError> {
        let valuation = self.valuation(engine)?;
        Ok((valuation.grand_total - self.paid_amount).max(Decimal::ZERO))
    }

    /// Derived payment status.
    pub fn payment_status(&self, engine: &ValuationEngine) -> Result<PaymentStatus, ValuationError> {
        let valuation = self.valuation(engine)?;
        Ok(PaymentStatus::derive(valuation.grand_total, self.paid_amount))
    }

    /// Payment snapshot used when delivering the job card this invoice came from.
    pub fn as_linked_invoice(&self, engine: &ValuationEngine) -> Result<LinkedInvoice, ValuationError> {
        let valuation = self.valuation(engine)?;
        Ok(LinkedInvoice {
            invoice_id: self.id,
            grand_total: valuation.grand_total,
            paid_amount: self.paid_amount,
            status: self.status,
        })
    }

    /// Structural edits are allowed in draft, and on job cards while work is in progress.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        match self.status {
            DocumentStatus::Draft => true,
            DocumentStatus::InProgress => self.kind == DocumentKind::JobCard,
            _ => false,
        }
    }

    /// Returns true once a job card has produced its invoice.
    #[must_use]
    pub fn is_converted(&self) -> bool {
        self.converted_invoice_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::MakingChargeType;
    use rust_decimal_macros::dec;

    fn invoice() -> Document {
        Document::draft(DocumentKind::Invoice, Some(PartyId::new()), dec!(20), Utc::now()).with_line(
            LineItem::new("ring", "22K band", 1, dec!(10.000), 916)
                .with_making_charge(MakingChargeType::Flat, dec!(5))
                .with_vat(dec!(5)),
        )
    }

    #[test]
    fn test_balance_due_and_status() {
        let engine = ValuationEngine::default();
        let mut doc = invoice();
        assert_eq!(doc.balance_due(&engine).unwrap(), dec!(215.250));
        assert_eq!(doc.payment_status(&engine).unwrap(), PaymentStatus::Unpaid);

        doc.paid_amount = dec!(199.750);
        assert_eq!(doc.balance_due(&engine).unwrap(), dec!(15.500));
        assert_eq!(doc.payment_status(&engine).unwrap(), PaymentStatus::Partial);

        let linked = doc.as_linked_invoice(&engine).unwrap();
        assert_eq!(linked.invoice_id, doc.id);
        assert_eq!(linked.balance_due(), dec!(15.500));
    }

    #[test]
    fn test_editability() {
        let mut doc = invoice();
        assert!(doc.is_editable());
        doc.status = DocumentStatus::Finalized;
        assert!(!doc.is_editable());

        let mut card = Document::draft(DocumentKind::JobCard, None, dec!(20), Utc::now());
        card.status = DocumentStatus::InProgress;
        assert!(card.is_editable());
        card.status = DocumentStatus::Completed;
        assert!(!card.is_editable());
    }

    #[test]
    fn test_document_json_round_trip_keeps_decimals() {
        let doc = invoice().with_round_off(dec!(-0.250));
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
