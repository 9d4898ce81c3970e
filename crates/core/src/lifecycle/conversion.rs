//! Job card to invoice conversion.
//!
//! A job card produces at most one invoice. The pre-check is a pure function
//! over the snapshot so callers can reject a reconversion before doing any
//! other work.

use chrono::{DateTime, Utc};
use karat_shared::types::LineItemId;

use super::document::Document;
use super::error::LifecycleError;
use super::service::precondition;
use super::types::{DocumentKind, DocumentStatus, LifecycleAction};

/// The two documents produced by a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// The job card, now pointing at its invoice.
    pub job_card: Document,
    /// The new draft invoice.
    pub invoice: Document,
}

/// Checks that `job_card` can still be converted.
pub fn ensure_convertible(job_card: &Document) -> Result<(), LifecycleError> {
    if job_card.kind != DocumentKind::JobCard {
        return Err(precondition(job_card, LifecycleAction::Convert));
    }
    if let Some(invoice_id) = job_card.converted_invoice_id {
        return Err(LifecycleError::DuplicateConversion {
            job_card_id: job_card.id,
            invoice_id,
        });
    }
    if matches!(
        job_card.status,
        DocumentStatus::Cancelled | DocumentStatus::Removed
    ) {
        return Err(precondition(job_card, LifecycleAction::Convert));
    }
    Ok(())
}

/// Converts a job card into a draft invoice.
///
/// Lines are copied under fresh ids. The invoice inherits the party, rate,
/// discount and round-off and records the job card it came from.
pub fn convert_to_invoice(
    job_card: &Document,
    now: DateTime<Utc>,
) -> Result<Conversion, LifecycleError> {
    ensure_convertible(job_card)?;

    let mut invoice = Document::draft(DocumentKind::Invoice, job_card.party_id, job_card.gold_rate, now);
    invoice.line_items = job_card
        .line_items
        .iter()
        .cloned()
        .map(|mut item| {
            item.id = LineItemId::new();
            item
        })
        .collect();
    invoice.discount_amount = job_card.discount_amount;
    invoice.round_off_amount = job_card.round_off_amount;
    invoice.source_job_card_id = Some(job_card.id);

    let mut card = job_card.clone();
    card.converted_invoice_id = Some(invoice.id);
    card.version += 1;

    Ok(Conversion {
        job_card: card,
        invoice,
    })
}
