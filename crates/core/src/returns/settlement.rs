//! Return drafts and refund settlement.
//!
//! Source-linked items are capped by the remaining balance of the invoice or
//! purchase they came from, whichever the return references. Manual items
//! are never capped.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use karat_shared::types::{AccountId, LineItemId, PartyId, ReturnId};
use rust_decimal::Decimal;
use serde::Serialize;

use super::balance::{compute_remaining, validate_item_values, validate_return_items};
use super::error::{RefundField, ReturnsError};
use super::types::{
    ReferenceType, RefundDetails, RefundMode, RemainingBalance, Return, ReturnItem, ReturnReference,
    ReturnStatus, ReturnTotals, ReturnType,
};
use crate::effects::{
    BalancePosting, PaymentMode, PostingReason, SideEffect, SourceRef, StockMovement,
    StockMovementType, TransactionRecord, TransactionType,
};
use crate::lifecycle::{Document, DocumentStatus, TransitionContext};
use crate::valuation::{STANDARD_VALUATION_PURITY, ValuationEngine};

/// Settled refund of a finalized return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// Refund mode.
    pub mode: RefundMode,
    /// Money leg, zero when absent.
    pub money_amount: Decimal,
    /// Account of the money leg.
    pub account_id: Option<AccountId>,
    /// Payment mode of the money leg.
    pub payment_mode: Option<PaymentMode>,
    /// Gold leg in grams, zero when absent.
    pub gold_grams: Decimal,
    /// Fineness of the gold leg.
    pub gold_purity: Option<u16>,
    /// What was returned.
    pub totals: ReturnTotals,
}

/// Result of finalizing a return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnFinalization {
    /// The finalized return.
    pub ret: Return,
    /// The settled refund.
    pub settlement: Settlement,
    /// Commands the host must execute.
    pub side_effects: Vec<SideEffect>,
}

/// A new return draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReturn {
    /// Sale or purchase return.
    pub return_type: ReturnType,
    /// What the return refers to.
    pub reference: ReturnReference,
    /// Customer or vendor.
    pub party_id: PartyId,
    /// Requested items.
    pub items: Vec<ReturnItem>,
    /// Refund fields, if already known.
    pub refund: RefundDetails,
}

/// Stateless service over return drafts and their settlement.
///
/// `source` is the document the return references (`None` for manual
/// returns) and `returns` every return referencing it, as read inside the
/// same consistent snapshot.
pub struct ReturnsLedger;

impl ReturnsLedger {
    /// Remaining balances that apply to `ret`, excluding its own reservation.
    ///
    /// Manual returns have no source and get an empty map.
    pub fn remaining_for(
        ret: &Return,
        source: Option<&Document>,
        returns: &[Return],
        engine: &ValuationEngine,
    ) -> Result<BTreeMap<LineItemId, RemainingBalance>, ReturnsError> {
        match check_source(ret.id, ret.return_type, ret.reference, source)? {
            Some(source) => compute_remaining(source, returns, Some(ret.id), engine),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Creates a draft that reserves its items against the source.
    pub fn create_draft(
        request: NewReturn,
        source: Option<&Document>,
        returns: &[Return],
        engine: &ValuationEngine,
        now: DateTime<Utc>,
    ) -> Result<Return, ReturnsError> {
        let ret = Return {
            id: ReturnId::new(),
            return_type: request.return_type,
            reference: request.reference,
            party_id: request.party_id,
            status: ReturnStatus::Draft,
            items: request.items,
            refund: request.refund,
            created_at: now,
            finalized_at: None,
            finalized_by: None,
            version: 0,
        };
        check_items(&ret, &ret.items, source, returns, engine)?;
        Ok(ret)
    }

    /// Replaces the items of a draft.
    pub fn update_items(
        ret: &Return,
        items: Vec<ReturnItem>,
        source: Option<&Document>,
        returns: &[Return],
        engine: &ValuationEngine,
    ) -> Result<Return, ReturnsError> {
        ensure_draft(ret)?;
        check_items(ret, &items, source, returns, engine)?;
        let mut updated = ret.clone();
        updated.items = items;
        updated.version += 1;
        Ok(updated)
    }

    /// Replaces the refund fields of a draft.
    pub fn update_refund(ret: &Return, refund: RefundDetails) -> Result<Return, ReturnsError> {
        ensure_draft(ret)?;
        let mut updated = ret.clone();
        updated.refund = refund;
        updated.version += 1;
        Ok(updated)
    }

    /// Checks that `ret` may be deleted, releasing its reservation.
    pub fn delete_draft(ret: &Return) -> Result<(), ReturnsError> {
        ensure_draft(ret)
    }

    /// Finalizes a draft and settles its refund.
    ///
    /// Items are re-validated against the current remaining balance without
    /// the draft's own reservation. Emits, in order: a journal record for
    /// the money leg, a gold posting for the gold leg, and for sale returns
    /// one stock movement per item re-crediting the returned weight.
    pub fn finalize(
        ret: &Return,
        source: Option<&Document>,
        returns: &[Return],
        ctx: &TransitionContext,
        engine: &ValuationEngine,
    ) -> Result<ReturnFinalization, ReturnsError> {
        ensure_draft(ret)?;
        if ret.items.is_empty() {
            return Err(ReturnsError::MissingRequiredField {
                return_id: ret.id,
                field: "items",
            });
        }
        check_items(ret, &ret.items, source, returns, engine)?;
        let mode = check_refund(ret.id, &ret.refund)?;

        let refund = &ret.refund;
        let reference = SourceRef::Return(ret.id);
        let mut side_effects = Vec::new();

        let money_leg = mode.has_money_leg().then_some(refund.account_id).flatten();
        if let Some(account_id) = money_leg {
            let transaction_type = match ret.return_type {
                ReturnType::SaleReturn => TransactionType::Debit,
                ReturnType::PurchaseReturn => TransactionType::Credit,
            };
            side_effects.push(SideEffect::Transaction(TransactionRecord {
                party_id: ret.party_id,
                account_id,
                amount: refund.money_amount,
                mode: refund.payment_mode,
                transaction_type,
                reference,
            }));
        }

        if mode.has_gold_leg() {
            // The business owes a customer gold; a vendor owes the business gold.
            let gold_delta = match ret.return_type {
                ReturnType::SaleReturn => -refund.gold_grams,
                ReturnType::PurchaseReturn => refund.gold_grams,
            };
            side_effects.push(SideEffect::BalancePosting(BalancePosting {
                party_id: ret.party_id,
                money_delta: Decimal::ZERO,
                gold_delta,
                reference,
                reason: PostingReason::ReturnGoldRefund,
            }));
        }

        if ret.return_type == ReturnType::SaleReturn {
            side_effects.extend(ret.items.iter().map(|item| {
                let entered_purity = item
                    .source_item_id
                    .zip(source)
                    .and_then(|(id, doc)| doc.line_items.iter().find(|line| line.id == id))
                    .map_or(STANDARD_VALUATION_PURITY, |line| line.purity);
                SideEffect::StockMovement(StockMovement {
                    movement_type: StockMovementType::SaleReturnIn,
                    header: reference,
                    line_item_id: item.source_item_id,
                    qty_delta: i64::from(item.qty),
                    weight_delta: engine.precision().round_weight(item.weight_grams),
                    purity: STANDARD_VALUATION_PURITY,
                    entered_purity,
                })
            }));
        }

        let settlement = Settlement {
            mode,
            money_amount: if mode.has_money_leg() { refund.money_amount } else { Decimal::ZERO },
            account_id: money_leg,
            payment_mode: mode.has_money_leg().then_some(refund.payment_mode),
            gold_grams: if mode.has_gold_leg() { refund.gold_grams } else { Decimal::ZERO },
            gold_purity: if mode.has_gold_leg() { refund.gold_purity } else { None },
            totals: ret.totals(),
        };

        let mut finalized = ret.clone();
        finalized.status = ReturnStatus::Finalized;
        finalized.finalized_at = Some(ctx.now);
        finalized.finalized_by = Some(ctx.actor);
        finalized.version += 1;

        Ok(ReturnFinalization {
            ret: finalized,
            settlement,
            side_effects,
        })
    }
}

fn ensure_draft(ret: &Return) -> Result<(), ReturnsError> {
    match ret.status {
        ReturnStatus::Draft => Ok(()),
        ReturnStatus::Finalized => Err(ReturnsError::AlreadyFinalized { return_id: ret.id }),
    }
}

fn check_items(
    ret: &Return,
    items: &[ReturnItem],
    source: Option<&Document>,
    returns: &[Return],
    engine: &ValuationEngine,
) -> Result<(), ReturnsError> {
    validate_item_values(items)?;
    let remaining = ReturnsLedger::remaining_for(ret, source, returns, engine)?;
    validate_return_items(&remaining, items).map_err(|rejected| ReturnsError::RemainingExceeded {
        return_id: ret.id,
        rejected,
    })
}

/// Resolves the source a return is capped against.
fn check_source<'a>(
    return_id: ReturnId,
    return_type: ReturnType,
    reference: ReturnReference,
    source: Option<&'a Document>,
) -> Result<Option<&'a Document>, ReturnsError> {
    if reference.reference_type == ReferenceType::Manual {
        return Ok(None);
    }
    if reference.reference_type != return_type.document_reference() {
        return Err(ReturnsError::ReferenceMismatch {
            return_id,
            return_type,
            reference_type: reference.reference_type,
        });
    }
    let expected = reference.document_id.ok_or(ReturnsError::MissingRequiredField {
        return_id,
        field: "reference_document_id",
    })?;
    let source = source
        .filter(|doc| doc.id == expected && Some(doc.kind) == reference.reference_type.document_kind())
        .ok_or(ReturnsError::SourceMismatch {
            return_id,
            expected,
            found: source.map(|doc| doc.id),
        })?;
    if source.status != DocumentStatus::Finalized {
        return Err(ReturnsError::SourceNotFinalized {
            document_id: source.id,
            status: source.status,
        });
    }
    Ok(Some(source))
}

fn check_refund(return_id: ReturnId, refund: &RefundDetails) -> Result<RefundMode, ReturnsError> {
    let invalid = |field, reason| ReturnsError::InvalidRefund {
        return_id,
        field,
        reason,
    };
    let mode = refund
        .mode
        .ok_or_else(|| invalid(RefundField::RefundMode, "is required"))?;
    if mode.has_money_leg() {
        if refund.money_amount <= Decimal::ZERO {
            return Err(invalid(RefundField::MoneyAmount, "must be positive"));
        }
        if refund.account_id.is_none() {
            return Err(invalid(RefundField::AccountId, "is required"));
        }
    }
    if mode.has_gold_leg() {
        if refund.gold_grams <= Decimal::ZERO {
            return Err(invalid(RefundField::GoldGrams, "must be positive"));
        }
        if !refund.gold_purity.is_some_and(|purity| (1..=999).contains(&purity)) {
            return Err(invalid(RefundField::GoldPurity, "must be between 1 and 999"));
        }
    }
    Ok(mode)
}
