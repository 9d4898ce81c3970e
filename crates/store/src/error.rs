//! Store error types.

use karat_core::effects::CollaboratorError;
use karat_core::lifecycle::LifecycleError;
use karat_core::returns::ReturnsError;
use karat_shared::types::{DocumentId, ReturnId};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the back-office store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No document with this id.
    #[error("Document {0} not found")]
    DocumentNotFound(DocumentId),

    /// No return with this id.
    #[error("Return {0} not found")]
    ReturnNotFound(ReturnId),

    /// A record with this id already exists.
    #[error("Record {0} already exists")]
    DuplicateId(Uuid),

    /// The caller edited an outdated snapshot.
    #[error("Record {id} is at version {actual}, caller expected {expected}")]
    VersionMismatch {
        /// The record.
        id: Uuid,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// The lifecycle rejected the operation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The returns ledger rejected the operation.
    #[error(transparent)]
    Returns(#[from] ReturnsError),

    /// A collaborator failed; nothing was committed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A row lock was poisoned by a panicking writer.
    #[error("Row lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DocumentNotFound(_) | Self::ReturnNotFound(_) => 404,
            Self::DuplicateId(_) | Self::VersionMismatch { .. } => 409,
            Self::Lifecycle(err) => err.status_code(),
            Self::Returns(err) => err.status_code(),
            Self::Collaborator(_) | Self::LockPoisoned => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DocumentNotFound(_) | Self::ReturnNotFound(_) => "NOT_FOUND",
            Self::DuplicateId(_) => "DUPLICATE_ID",
            Self::VersionMismatch { .. } => "VERSION_MISMATCH",
            Self::Lifecycle(err) => err.error_code(),
            Self::Returns(err) => err.error_code(),
            Self::Collaborator(_) => "COLLABORATOR_FAILED",
            Self::LockPoisoned => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for karat_shared::AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DocumentNotFound(_) | StoreError::ReturnNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            StoreError::DuplicateId(_) | StoreError::VersionMismatch { .. } => {
                Self::Conflict(err.to_string())
            }
            StoreError::Lifecycle(inner) => inner.into(),
            StoreError::Returns(inner) => inner.into(),
            StoreError::Collaborator(inner) => inner.into(),
            StoreError::LockPoisoned => Self::Internal(err.to_string()),
        }
    }
}
