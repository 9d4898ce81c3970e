//! Payment application against invoices and purchases.

use karat_shared::types::AccountId;
use rust_decimal::Decimal;

use super::document::Document;
use super::error::LifecycleError;
use super::service::precondition;
use super::types::{DocumentKind, DocumentStatus, LifecycleAction, PaymentStatus};
use crate::effects::{
    BalancePosting, PaymentMode, PostingReason, SideEffect, SourceRef, TransactionRecord,
    TransactionType,
};
use crate::valuation::ValuationEngine;

/// A payment to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Positive amount, not above the balance due.
    pub amount: Decimal,
    /// Business account receiving or paying.
    pub account_id: AccountId,
    /// How the money moved.
    pub mode: PaymentMode,
}

/// Result of an accepted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    /// The document with the new paid amount.
    pub document: Document,
    /// Balance due after the payment.
    pub balance_due: Decimal,
    /// Payment status after the payment.
    pub payment_status: PaymentStatus,
    /// Commands the host must execute.
    pub side_effects: Vec<SideEffect>,
}

/// Applies a payment to a draft or finalized invoice or purchase.
///
/// Always records a transaction: a credit for invoices, a debit for
/// purchases. Once finalized the outstanding balance was already posted to
/// the party ledger, so the payment also posts the matching reduction.
pub fn apply_payment(
    document: &Document,
    payment: &PaymentRequest,
    engine: &ValuationEngine,
) -> Result<PaymentOutcome, LifecycleError> {
    if !document.kind.is_financial()
        || !matches!(
            document.status,
            DocumentStatus::Draft | DocumentStatus::Finalized
        )
    {
        return Err(precondition(document, LifecycleAction::ApplyPayment));
    }
    let party_id = document
        .party_id
        .ok_or_else(|| LifecycleError::MissingRequiredField {
            document_id: document.id,
            field: "party_id".into(),
        })?;
    // Amounts below the money precision round to zero.
    let amount = engine.precision().round_money(payment.amount);
    if amount <= Decimal::ZERO {
        return Err(LifecycleError::NonPositivePayment {
            document_id: document.id,
            amount: payment.amount,
        });
    }

    let valuation = document
        .valuation(engine)
        .map_err(|source| LifecycleError::Valuation {
            document_id: document.id,
            source,
        })?;
    let balance_due = (valuation.grand_total - document.paid_amount).max(Decimal::ZERO);
    if amount > balance_due {
        return Err(LifecycleError::Overpayment {
            document_id: document.id,
            amount,
            balance_due,
        });
    }

    let reference = SourceRef::Document(document.id);
    let (transaction_type, ledger_delta) = match document.kind {
        DocumentKind::Purchase => (TransactionType::Debit, amount),
        _ => (TransactionType::Credit, -amount),
    };

    let mut side_effects = vec![SideEffect::Transaction(TransactionRecord {
        party_id,
        account_id: payment.account_id,
        amount,
        mode: payment.mode,
        transaction_type,
        reference,
    })];
    if document.status == DocumentStatus::Finalized {
        side_effects.push(SideEffect::BalancePosting(BalancePosting {
            party_id,
            money_delta: ledger_delta,
            gold_delta: Decimal::ZERO,
            reference,
            reason: PostingReason::PaymentApplied,
        }));
    }

    let mut updated = document.clone();
    updated.paid_amount += amount;
    updated.version += 1;

    Ok(PaymentOutcome {
        balance_due: balance_due - amount,
        payment_status: PaymentStatus::derive(valuation.grand_total, updated.paid_amount),
        document: updated,
        side_effects,
    })
}
