//! Valuation error types.
//!
//! Every variant names the offending field so the caller can point the user
//! at it. Line-level variants also carry the zero-based line index.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors raised while validating valuation input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValuationError {
    /// A line weight is negative.
    #[error("Line {line}: {field} must not be negative, got {value}")]
    NegativeWeight {
        /// Zero-based line index.
        line: usize,
        /// `weight_in` or `weight_out`.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// The making charge value is negative.
    #[error("Line {line}: making_charge_value must not be negative, got {value}")]
    NegativeMakingCharge {
        /// Zero-based line index.
        line: usize,
        /// The rejected value.
        value: Decimal,
    },

    /// VAT percent is outside [0, 100].
    #[error("Line {line}: vat_percent must be between 0 and 100, got {value}")]
    VatOutOfRange {
        /// Zero-based line index.
        line: usize,
        /// The rejected value.
        value: Decimal,
    },

    /// Quantity is zero or negative.
    #[error("Line {line}: quantity must be positive, got {value}")]
    NonPositiveQuantity {
        /// Zero-based line index.
        line: usize,
        /// The rejected value.
        value: i32,
    },

    /// Purity is outside 1 to 999.
    #[error("Line {line}: purity must be between 1 and 999, got {value}")]
    PurityOutOfRange {
        /// Zero-based line index.
        line: usize,
        /// The rejected value.
        value: u16,
    },

    /// The metal rate is negative.
    #[error("rate must not be negative, got {0}")]
    NegativeRate(Decimal),

    /// The document discount is negative.
    #[error("discount_amount must not be negative, got {0}")]
    NegativeDiscount(Decimal),

    /// An intermediate amount exceeds the representable range.
    #[error("{field} is out of range{}", .line.map_or_else(String::new, |l| format!(" on line {l}")))]
    Overflow {
        /// Zero-based line index, `None` for document totals.
        line: Option<usize>,
        /// The amount being computed.
        field: &'static str,
    },
}

impl ValuationError {
    /// Returns the name of the offending field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::NegativeWeight { field, .. } => *field,
            Self::NegativeMakingCharge { .. } => "making_charge_value",
            Self::VatOutOfRange { .. } => "vat_percent",
            Self::NonPositiveQuantity { .. } => "quantity",
            Self::PurityOutOfRange { .. } => "purity",
            Self::NegativeRate(_) => "rate",
            Self::NegativeDiscount(_) => "discount_amount",
            Self::Overflow { field, .. } => field,
        }
    }

    /// Returns the zero-based line index for line-level errors.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::NegativeWeight { line, .. }
            | Self::NegativeMakingCharge { line, .. }
            | Self::VatOutOfRange { line, .. }
            | Self::NonPositiveQuantity { line, .. }
            | Self::PurityOutOfRange { line, .. } => Some(*line),
            Self::Overflow { line, .. } => *line,
            Self::NegativeRate(_) | Self::NegativeDiscount(_) => None,
        }
    }

    /// Re-targets a line-level error at `index`.
    #[must_use]
    pub(crate) fn at_line(mut self, index: usize) -> Self {
        match &mut self {
            Self::NegativeWeight { line, .. }
            | Self::NegativeMakingCharge { line, .. }
            | Self::VatOutOfRange { line, .. }
            | Self::NonPositiveQuantity { line, .. }
            | Self::PurityOutOfRange { line, .. } => *line = index,
            Self::Overflow { line, .. } => {
                if line.is_some() {
                    *line = Some(index);
                }
            }
            Self::NegativeRate(_) | Self::NegativeDiscount(_) => {}
        }
        self
    }

    /// Valuation errors are always caller-correctable.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NegativeWeight { .. } => "NEGATIVE_WEIGHT",
            Self::NegativeMakingCharge { .. } => "NEGATIVE_MAKING_CHARGE",
            Self::VatOutOfRange { .. } => "VAT_OUT_OF_RANGE",
            Self::NonPositiveQuantity { .. } => "NON_POSITIVE_QUANTITY",
            Self::PurityOutOfRange { .. } => "PURITY_OUT_OF_RANGE",
            Self::NegativeRate(_) => "NEGATIVE_RATE",
            Self::NegativeDiscount(_) => "NEGATIVE_DISCOUNT",
            Self::Overflow { .. } => "AMOUNT_OUT_OF_RANGE",
        }
    }
}

impl From<ValuationError> for karat_shared::AppError {
    fn from(err: ValuationError) -> Self {
        err.category().into_app_error(err.to_string())
    }
}
