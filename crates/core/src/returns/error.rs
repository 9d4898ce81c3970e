//! Returns error types.

use karat_shared::types::{DocumentId, LineItemId, ReturnId, ReturnItemId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::types::{ReferenceType, ReturnType};
use crate::error::ErrorCategory;
use crate::lifecycle::DocumentStatus;
use crate::valuation::ValuationError;

/// Why a requested item was rejected against its remaining balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Requested pieces exceed what remains.
    QtyExceeded {
        /// Pieces requested by this item.
        requested: i64,
        /// Pieces this item may still take.
        allowed_max: i64,
    },
    /// Requested grams exceed what remains.
    WeightExceeded {
        /// Grams requested for this item.
        requested: Decimal,
        /// Grams this item may still take.
        allowed_max: Decimal,
    },
    /// The source line does not exist on the referenced document.
    UnknownSourceItem,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QtyExceeded {
                requested,
                allowed_max,
            } => write!(f, "qty {requested} exceeds allowed max {allowed_max}"),
            Self::WeightExceeded {
                requested,
                allowed_max,
            } => write!(f, "weight {requested} exceeds allowed max {allowed_max}"),
            Self::UnknownSourceItem => write!(f, "unknown source item"),
        }
    }
}

/// One rejected dimension of one requested item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RejectedItem {
    /// The requested return item.
    pub item_id: ReturnItemId,
    /// Its source line.
    pub source_item_id: LineItemId,
    /// What was violated.
    pub reason: RejectionReason,
}

impl fmt::Display for RejectedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {}: {}", self.item_id, self.reason)
    }
}

/// Refund field named by a settlement rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundField {
    /// `refund_mode`.
    RefundMode,
    /// `refund_money_amount`.
    MoneyAmount,
    /// `account_id`.
    AccountId,
    /// `refund_gold_grams`.
    GoldGrams,
    /// `refund_gold_purity`.
    GoldPurity,
}

impl RefundField {
    /// Returns the field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefundMode => "refund_mode",
            Self::MoneyAmount => "refund_money_amount",
            Self::AccountId => "account_id",
            Self::GoldGrams => "refund_gold_grams",
            Self::GoldPurity => "refund_gold_purity",
        }
    }
}

impl fmt::Display for RefundField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during returns operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnsError {
    /// A return item carries an invalid value.
    #[error("Return item {item_id}: {field} {reason}")]
    InvalidItem {
        /// The item.
        item_id: ReturnItemId,
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Some items exceed the remaining returnable balance.
    #[error("Return {return_id} exceeds remaining balance: {}", join_rejections(.rejected))]
    RemainingExceeded {
        /// The return.
        return_id: ReturnId,
        /// Every rejected item dimension.
        rejected: Vec<RejectedItem>,
    },

    /// The return is already finalized.
    #[error("Return {return_id} is already finalized")]
    AlreadyFinalized {
        /// The return.
        return_id: ReturnId,
    },

    /// A field required by the operation is missing.
    #[error("Return {return_id} is missing required field {field}")]
    MissingRequiredField {
        /// The return.
        return_id: ReturnId,
        /// The missing field.
        field: &'static str,
    },

    /// Refund settlement fields are incomplete or invalid.
    #[error("Return {return_id}: {field} {reason}")]
    InvalidRefund {
        /// The return.
        return_id: ReturnId,
        /// The offending field.
        field: RefundField,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The return type does not fit the reference type.
    #[error("Return {return_id}: a {return_type} cannot reference a {reference_type}")]
    ReferenceMismatch {
        /// The return.
        return_id: ReturnId,
        /// Its type.
        return_type: ReturnType,
        /// The reference it carries.
        reference_type: ReferenceType,
    },

    /// The supplied source document is not the referenced one.
    #[error("Return {return_id} references document {expected}, which was not supplied")]
    SourceMismatch {
        /// The return.
        return_id: ReturnId,
        /// The referenced document.
        expected: DocumentId,
        /// The document supplied instead.
        found: Option<DocumentId>,
    },

    /// Only finalized documents can be returned against.
    #[error("Document {document_id} is {status}; only finalized documents accept returns")]
    SourceNotFinalized {
        /// The source document.
        document_id: DocumentId,
        /// Its status.
        status: DocumentStatus,
    },

    /// The source document failed valuation.
    #[error("Document {document_id}: {source}")]
    Valuation {
        /// The source document.
        document_id: DocumentId,
        /// The valuation failure.
        #[source]
        source: ValuationError,
    },
}

fn join_rejections(rejected: &[RejectedItem]) -> String {
    rejected
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ReturnsError {
    /// Returns the broad category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidItem { .. }
            | Self::InvalidRefund { .. }
            | Self::ReferenceMismatch { .. }
            | Self::SourceMismatch { .. }
            | Self::Valuation { .. } => ErrorCategory::Validation,
            Self::MissingRequiredField { .. } | Self::SourceNotFinalized { .. } => {
                ErrorCategory::PreconditionFailed
            }
            Self::RemainingExceeded { .. } | Self::AlreadyFinalized { .. } => {
                ErrorCategory::Conflict
            }
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
            Self::InvalidItem { .. } => "INVALID_RETURN_ITEM",
            Self::RemainingExceeded { .. } => "REMAINING_EXCEEDED",
            Self::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            Self::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
            Self::InvalidRefund { .. } => "INVALID_REFUND",
            Self::ReferenceMismatch { .. } => "REFERENCE_MISMATCH",
            Self::SourceMismatch { .. } => "SOURCE_MISMATCH",
            Self::SourceNotFinalized { .. } => "SOURCE_NOT_FINALIZED",
            Self::Valuation { source, .. } => source.error_code(),
        }
    }
}

impl From<ReturnsError> for karat_shared::AppError {
    fn from(err: ReturnsError) -> Self {
        err.category().into_app_error(err.to_string())
    }
}
