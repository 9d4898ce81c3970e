//! Error classification shared by every engine module.

use karat_shared::AppError;

/// Broad class of a rejected operation.
///
/// Every module error maps onto exactly one category so callers can decide
/// how to render it without matching on module-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or out-of-range input; fix the input and retry.
    Validation,
    /// A state machine rule was violated.
    PreconditionFailed,
    /// The request conflicts with current state.
    Conflict,
    /// A job card cannot be delivered yet.
    DeliveryBlocked,
}

impl ErrorCategory {
    /// Wraps a rendered message into the matching `AppError` variant.
    #[must_use]
    pub fn into_app_error(self, message: String) -> AppError {
        match self {
            Self::Validation => AppError::Validation(message),
            Self::PreconditionFailed => AppError::PreconditionFailed(message),
            Self::Conflict => AppError::Conflict(message),
            Self::DeliveryBlocked => AppError::DeliveryBlocked(message),
        }
    }
}
