//! Application-wide error types.
//!
//! Module errors in `karat-core` and `karat-store` are converted into this
//! taxonomy at the edge so a transport can render them uniformly.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range input, recoverable by correcting it.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A state machine rule was violated.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The request conflicts with current state (already finalized,
    /// remaining balance exceeded, duplicate conversion, stale version).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A job card cannot be delivered yet.
    #[error("Delivery blocked: {0}")]
    DeliveryBlocked(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Collaborator (inventory, ledger, journal) rejected a command.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::PreconditionFailed(_) | Self::DeliveryBlocked(_) => 422,
            Self::ExternalService(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Self::Conflict(_) => "CONFLICT",
            Self::DeliveryBlocked(_) => "DELIVERY_BLOCKED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
