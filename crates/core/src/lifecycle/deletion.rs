//! Deletion impact query and guarded deletion.
//!
//! Deleting is a two-step operation: the caller queries the impact, shows it
//! for confirmation, then commits with the same report. A report taken at an
//! older version is rejected.

use karat_shared::types::{DocumentId, ReturnId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use super::document::Document;
use super::error::LifecycleError;
use super::service::precondition;
use super::types::{DocumentStatus, LifecycleAction};

/// A linked record that prevents deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionBlocker {
    /// Returns reference the document.
    ReferencedByReturns,
    /// Payments were recorded against it.
    PaymentsRecorded,
    /// The job card already produced an invoice.
    ConvertedToInvoice,
    /// The invoice was produced from a job card.
    ConvertedFromJobCard,
}

impl DeletionBlocker {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReferencedByReturns => "referenced_by_returns",
            Self::PaymentsRecorded => "payments_recorded",
            Self::ConvertedToInvoice => "converted_to_invoice",
            Self::ConvertedFromJobCard => "converted_from_job_card",
        }
    }
}

impl fmt::Display for DeletionBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What deleting a document would affect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionImpact {
    /// The document.
    pub document_id: DocumentId,
    /// Version the report was taken at.
    pub version: u64,
    /// Status at query time.
    pub status: DocumentStatus,
    /// Invoice produced from this job card.
    pub converted_invoice_id: Option<DocumentId>,
    /// Job card this invoice came from.
    pub source_job_card_id: Option<DocumentId>,
    /// Money already recorded against the document.
    pub paid_amount: Decimal,
    /// Returns referencing the document.
    pub return_ids: Vec<ReturnId>,
    /// Conditions that block the deletion.
    pub blockers: Vec<DeletionBlocker>,
}

impl DeletionImpact {
    /// Returns true if the deletion can proceed.
    #[must_use]
    pub fn is_deletable(&self) -> bool {
        self.status == DocumentStatus::Draft && self.blockers.is_empty()
    }
}

/// Reports what deleting `document` would affect.
///
/// `return_ids` are the returns referencing the document, drafts included.
#[must_use]
pub fn impact(document: &Document, return_ids: Vec<ReturnId>) -> DeletionImpact {
    let mut blockers = Vec::new();
    if !return_ids.is_empty() {
        blockers.push(DeletionBlocker::ReferencedByReturns);
    }
    if document.paid_amount > Decimal::ZERO {
        blockers.push(DeletionBlocker::PaymentsRecorded);
    }
    if document.converted_invoice_id.is_some() {
        blockers.push(DeletionBlocker::ConvertedToInvoice);
    }
    // The job card keeps pointing at its invoice for delivery.
    if document.source_job_card_id.is_some() {
        blockers.push(DeletionBlocker::ConvertedFromJobCard);
    }
    DeletionImpact {
        document_id: document.id,
        version: document.version,
        status: document.status,
        converted_invoice_id: document.converted_invoice_id,
        source_job_card_id: document.source_job_card_id,
        paid_amount: document.paid_amount,
        return_ids,
        blockers,
    }
}

/// Moves a draft to `Removed` after the caller confirmed `confirmed`.
pub fn delete(document: &Document, confirmed: &DeletionImpact) -> Result<Document, LifecycleError> {
    if confirmed.document_id != document.id || confirmed.version != document.version {
        return Err(LifecycleError::StaleImpactReport {
            document_id: document.id,
        });
    }
    match document.status {
        DocumentStatus::Draft => {}
        DocumentStatus::Finalized => {
            return Err(LifecycleError::AlreadyFinalized {
                document_id: document.id,
            });
        }
        _ => return Err(precondition(document, LifecycleAction::Delete)),
    }
    if !confirmed.blockers.is_empty() {
        return Err(LifecycleError::DeletionBlocked {
            document_id: document.id,
            blockers: confirmed.blockers.clone(),
        });
    }

    let mut removed = document.clone();
    removed.status = DocumentStatus::Removed;
    removed.version += 1;
    Ok(removed)
}
