//! Lifecycle error types.
//!
//! Every rejected transition carries a typed reason and the id of the
//! document it concerns.

use karat_shared::types::DocumentId;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::deletion::DeletionBlocker;
use super::types::{DocumentStatus, LifecycleAction};
use crate::error::ErrorCategory;
use crate::valuation::ValuationError;

/// Why a job card cannot be delivered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeliveryBlockReason {
    /// The job card was never converted, or its invoice could not be loaded.
    MissingInvoice,
    /// The invoice has nothing paid.
    Unpaid {
        /// Outstanding amount.
        balance_due: Decimal,
    },
    /// The invoice is partly paid.
    Partial {
        /// Outstanding amount.
        balance_due: Decimal,
    },
}

impl DeliveryBlockReason {
    /// Returns the sub-reason label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingInvoice => "missing_invoice",
            Self::Unpaid { .. } => "unpaid",
            Self::Partial { .. } => "partial",
        }
    }

    /// Outstanding amount, when an invoice exists.
    #[must_use]
    pub fn balance_due(&self) -> Option<Decimal> {
        match self {
            Self::MissingInvoice => None,
            Self::Unpaid { balance_due } | Self::Partial { balance_due } => Some(*balance_due),
        }
    }
}

impl fmt::Display for DeliveryBlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.balance_due() {
            Some(balance) => write!(f, "{}, {}", self.as_str(), balance),
            None => write!(f, "{}", self.as_str()),
        }
    }
}

/// Errors that can occur during document lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The action is not allowed from the current status or for this kind.
    #[error("Cannot {action} document {document_id} in status {status}")]
    PreconditionFailed {
        /// The document.
        document_id: DocumentId,
        /// Its current status.
        status: DocumentStatus,
        /// The rejected action.
        action: LifecycleAction,
    },

    /// The document is already finalized.
    #[error("Document {document_id} is already finalized")]
    AlreadyFinalized {
        /// The document.
        document_id: DocumentId,
    },

    /// A field required to finalize is missing or empty.
    #[error("Document {document_id} is missing required field {field}")]
    MissingRequiredField {
        /// The document.
        document_id: DocumentId,
        /// The missing field.
        field: String,
    },

    /// The job card cannot be delivered yet.
    #[error("DeliveryBlocked({reason}) for job card {job_card_id}")]
    DeliveryBlocked {
        /// The job card.
        job_card_id: DocumentId,
        /// The unmet condition.
        reason: DeliveryBlockReason,
    },

    /// The job card already produced an invoice.
    #[error("Job card {job_card_id} was already converted to invoice {invoice_id}")]
    DuplicateConversion {
        /// The job card.
        job_card_id: DocumentId,
        /// The invoice it produced.
        invoice_id: DocumentId,
    },

    /// The document's line items or pricing failed valuation.
    #[error("Document {document_id}: {source}")]
    Valuation {
        /// The document.
        document_id: DocumentId,
        /// The valuation failure.
        #[source]
        source: ValuationError,
    },

    /// A payment amount was zero or negative.
    #[error("Payment on document {document_id} must be positive, got {amount}")]
    NonPositivePayment {
        /// The document.
        document_id: DocumentId,
        /// The rejected amount.
        amount: Decimal,
    },

    /// A payment or paid amount exceeds the balance due.
    #[error("Payment of {amount} on document {document_id} exceeds balance due {balance_due}")]
    Overpayment {
        /// The document.
        document_id: DocumentId,
        /// The rejected amount.
        amount: Decimal,
        /// What was outstanding.
        balance_due: Decimal,
    },

    /// The deletion impact report no longer matches the document.
    #[error("Deletion impact for document {document_id} is stale; query it again")]
    StaleImpactReport {
        /// The document.
        document_id: DocumentId,
    },

    /// Linked records prevent deletion.
    #[error("Document {document_id} cannot be deleted: {}", join_blockers(.blockers))]
    DeletionBlocked {
        /// The document.
        document_id: DocumentId,
        /// What blocks the deletion.
        blockers: Vec<DeletionBlocker>,
    },
}

fn join_blockers(blockers: &[DeletionBlocker]) -> String {
    blockers
        .iter()
        .map(DeletionBlocker::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl LifecycleError {
    /// Returns the broad category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PreconditionFailed { .. } | Self::MissingRequiredField { .. } => {
                ErrorCategory::PreconditionFailed
            }
            Self::AlreadyFinalized { .. }
            | Self::DuplicateConversion { .. }
            | Self::Overpayment { .. }
            | Self::StaleImpactReport { .. }
            | Self::DeletionBlocked { .. } => ErrorCategory::Conflict,
            Self::DeliveryBlocked { .. } => ErrorCategory::DeliveryBlocked,
            Self::Valuation { .. } | Self::NonPositivePayment { .. } => ErrorCategory::Validation,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::Conflict => 409,
            ErrorCategory::PreconditionFailed | ErrorCategory::DeliveryBlocked => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PreconditionFailed { .. } => "PRECONDITION_FAILED",
            Self::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            Self::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
            Self::DeliveryBlocked { .. } => "DELIVERY_BLOCKED",
            Self::DuplicateConversion { .. } => "DUPLICATE_CONVERSION",
            Self::Valuation { source, .. } => source.error_code(),
            Self::NonPositivePayment { .. } => "NON_POSITIVE_PAYMENT",
            Self::Overpayment { .. } => "OVERPAYMENT",
            Self::StaleImpactReport { .. } => "STALE_IMPACT_REPORT",
            Self::DeletionBlocked { .. } => "DELETION_BLOCKED",
        }
    }

    /// Returns the document the error concerns.
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        match self {
            Self::PreconditionFailed { document_id, .. }
            | Self::AlreadyFinalized { document_id }
            | Self::MissingRequiredField { document_id, .. }
            | Self::Valuation { document_id, .. }
            | Self::NonPositivePayment { document_id, .. }
            | Self::Overpayment { document_id, .. }
            | Self::StaleImpactReport { document_id }
            | Self::DeletionBlocked { document_id, .. } => *document_id,
            Self::DeliveryBlocked { job_card_id, .. }
            | Self::DuplicateConversion { job_card_id, .. } => *job_card_id,
        }
    }
}

impl From<LifecycleError> for karat_shared::AppError {
    fn from(err: LifecycleError) -> Self {
        err.category().into_app_error(err.to_string())
    }
}
