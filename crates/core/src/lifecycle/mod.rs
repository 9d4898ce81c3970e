//! Document lifecycle for job cards, invoices and purchases.
//!
//! Statuses are closed enums and every transition is a function from a
//! document snapshot to either the next snapshot plus declared side effects,
//! or a typed rejection.
//!
//! # Modules
//!
//! - `types` - Kinds, statuses, actions, payment status, transition context
//! - `document` - The document aggregate
//! - `error` - Typed rejection reasons
//! - `service` - Finalize, job card progression, delivery, edit guard
//! - `conversion` - One-time job card to invoice conversion
//! - `payment` - Payment application
//! - `deletion` - Impact query and guarded deletion

pub mod conversion;
pub mod deletion;
pub mod document;
pub mod error;
pub mod payment;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use conversion::{Conversion, convert_to_invoice, ensure_convertible};
pub use deletion::{DeletionBlocker, DeletionImpact, delete, impact};
pub use document::Document;
pub use error::{DeliveryBlockReason, LifecycleError};
pub use payment::{PaymentOutcome, PaymentRequest, apply_payment};
pub use service::{LifecycleService, TransitionOutcome};
pub use types::{
    DocumentKind, DocumentStatus, LifecycleAction, LinkedInvoice, PaymentStatus,
    TransitionContext,
};
