//! Lifecycle service for document state transitions.
//!
//! Transitions take the current document snapshot and return the updated
//! document plus the side effects the host must execute atomically with
//! persisting it. Nothing here touches a collaborator.

use rust_decimal::Decimal;

use super::document::Document;
use super::error::{DeliveryBlockReason, LifecycleError};
use super::types::{DocumentKind, DocumentStatus, LifecycleAction, PaymentStatus, TransitionContext};
use crate::effects::{
    BalancePosting, PostingReason, SideEffect, SourceRef, StockMovement, StockMovementType,
};
use crate::valuation::{
    DocumentValuation, LineItem, STANDARD_VALUATION_PURITY, ValuationEngine,
};

/// Result of an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The document after the transition, with its version bumped.
    pub document: Document,
    /// Valuation computed during finalization.
    pub valuation: Option<DocumentValuation>,
    /// Commands the host must execute.
    pub side_effects: Vec<SideEffect>,
}

impl TransitionOutcome {
    fn status_only(mut document: Document, status: DocumentStatus) -> Self {
        document.status = status;
        document.version += 1;
        Self {
            document,
            valuation: None,
            side_effects: Vec::new(),
        }
    }
}

/// Stateless service for document transitions.
pub struct LifecycleService;

impl LifecycleService {
    /// Moves `document` to `target`.
    ///
    /// Dispatches to the kind-specific transition. Deletion is not reachable
    /// here because it requires an impact report; use [`super::deletion::delete`].
    pub fn transition(
        document: &Document,
        target: DocumentStatus,
        ctx: &TransitionContext,
        engine: &ValuationEngine,
    ) -> Result<TransitionOutcome, LifecycleError> {
        match (document.kind, target) {
            (DocumentKind::Invoice | DocumentKind::Purchase, DocumentStatus::Finalized) => {
                Self::finalize(document, ctx, engine)
            }
            (DocumentKind::JobCard, DocumentStatus::InProgress) => Self::start(document),
            (DocumentKind::JobCard, DocumentStatus::Completed) => Self::complete(document),
            (DocumentKind::JobCard, DocumentStatus::Delivered) => Self::deliver(document, ctx),
            (DocumentKind::JobCard, DocumentStatus::Cancelled) => Self::cancel(document),
            (_, DocumentStatus::Removed) => Err(precondition(document, LifecycleAction::Delete)),
            (_, DocumentStatus::Finalized) => Err(precondition(document, LifecycleAction::Finalize)),
            (_, DocumentStatus::InProgress) => Err(precondition(document, LifecycleAction::Start)),
            (_, DocumentStatus::Completed) => Err(precondition(document, LifecycleAction::Complete)),
            (_, DocumentStatus::Delivered) => Err(precondition(document, LifecycleAction::Deliver)),
            (_, DocumentStatus::Cancelled) => Err(precondition(document, LifecycleAction::Cancel)),
            (_, DocumentStatus::Draft) => Err(precondition(document, LifecycleAction::Edit)),
        }
    }

    /// Finalizes a draft invoice or purchase.
    ///
    /// Emits, in order: one stock movement per line booked at
    /// [`STANDARD_VALUATION_PURITY`], a balance posting for
    /// `grand_total − paid_amount` when non-zero, and a document lock.
    /// A second call on the same document fails with `AlreadyFinalized`.
    pub fn finalize(
        document: &Document,
        ctx: &TransitionContext,
        engine: &ValuationEngine,
    ) -> Result<TransitionOutcome, LifecycleError> {
        if !document.kind.is_financial() {
            return Err(precondition(document, LifecycleAction::Finalize));
        }
        match document.status {
            DocumentStatus::Draft => {}
            DocumentStatus::Finalized => {
                return Err(LifecycleError::AlreadyFinalized {
                    document_id: document.id,
                });
            }
            _ => return Err(precondition(document, LifecycleAction::Finalize)),
        }

        let party_id = require_fields(document)?;
        let valuation = document
            .valuation(engine)
            .map_err(|source| LifecycleError::Valuation {
                document_id: document.id,
                source,
            })?;

        let balance = valuation.grand_total - document.paid_amount;
        if balance < Decimal::ZERO {
            return Err(LifecycleError::Overpayment {
                document_id: document.id,
                amount: document.paid_amount,
                balance_due: valuation.grand_total,
            });
        }

        let header = SourceRef::Document(document.id);
        let (movement_type, sign, reason) = match document.kind {
            DocumentKind::Purchase => (
                StockMovementType::PurchaseIn,
                Decimal::ONE,
                PostingReason::PurchasePayable,
            ),
            _ => (
                StockMovementType::SaleOut,
                Decimal::NEGATIVE_ONE,
                PostingReason::InvoiceReceivable,
            ),
        };

        let mut side_effects: Vec<SideEffect> = document
            .line_items
            .iter()
            .map(|item| SideEffect::StockMovement(stock_movement(item, header, movement_type, sign, engine)))
            .collect();

        if !balance.is_zero() {
            // Receivables grow the customer's balance; payables shrink the vendor's.
            side_effects.push(SideEffect::BalancePosting(BalancePosting {
                party_id,
                money_delta: -sign * balance,
                gold_delta: Decimal::ZERO,
                reference: header,
                reason,
            }));
        }
        side_effects.push(SideEffect::LockDocument {
            document_id: document.id,
            locked_by: ctx.actor,
        });

        let mut updated = document.clone();
        updated.status = DocumentStatus::Finalized;
        updated.finalized_at = Some(ctx.now);
        updated.locked_by = Some(ctx.actor);
        updated.version += 1;

        Ok(TransitionOutcome {
            document: updated,
            valuation: Some(valuation),
            side_effects,
        })
    }

    /// Starts work on a job card.
    pub fn start(document: &Document) -> Result<TransitionOutcome, LifecycleError> {
        match (document.kind, document.status) {
            (DocumentKind::JobCard, DocumentStatus::Draft) => Ok(TransitionOutcome::status_only(
                document.clone(),
                DocumentStatus::InProgress,
            )),
            _ => Err(precondition(document, LifecycleAction::Start)),
        }
    }

    /// Marks job card work as finished.
    pub fn complete(document: &Document) -> Result<TransitionOutcome, LifecycleError> {
        match (document.kind, document.status) {
            (DocumentKind::JobCard, DocumentStatus::InProgress) => Ok(
                TransitionOutcome::status_only(document.clone(), DocumentStatus::Completed),
            ),
            _ => Err(precondition(document, LifecycleAction::Complete)),
        }
    }

    /// Cancels a job card that has not been delivered.
    pub fn cancel(document: &Document) -> Result<TransitionOutcome, LifecycleError> {
        match (document.kind, document.status) {
            (
                DocumentKind::JobCard,
                DocumentStatus::Draft | DocumentStatus::InProgress | DocumentStatus::Completed,
            ) => Ok(TransitionOutcome::status_only(
                document.clone(),
                DocumentStatus::Cancelled,
            )),
            _ => Err(precondition(document, LifecycleAction::Cancel)),
        }
    }

    /// Hands a completed job card over to the customer.
    ///
    /// Requires the job card to have been converted and the invoice in
    /// `ctx.linked_invoice` to be fully paid. A removed invoice counts as
    /// missing.
    pub fn deliver(
        document: &Document,
        ctx: &TransitionContext,
    ) -> Result<TransitionOutcome, LifecycleError> {
        if document.kind != DocumentKind::JobCard || document.status != DocumentStatus::Completed {
            return Err(precondition(document, LifecycleAction::Deliver));
        }

        let blocked = |reason| LifecycleError::DeliveryBlocked {
            job_card_id: document.id,
            reason,
        };
        let invoice = match (document.converted_invoice_id, ctx.linked_invoice) {
            (Some(expected), Some(invoice))
                if invoice.invoice_id == expected && invoice.status != DocumentStatus::Removed =>
            {
                invoice
            }
            _ => return Err(blocked(DeliveryBlockReason::MissingInvoice)),
        };

        let balance_due = invoice.balance_due();
        match invoice.payment_status() {
            PaymentStatus::Paid => Ok(TransitionOutcome::status_only(
                document.clone(),
                DocumentStatus::Delivered,
            )),
            PaymentStatus::Partial => Err(blocked(DeliveryBlockReason::Partial { balance_due })),
            PaymentStatus::Unpaid => Err(blocked(DeliveryBlockReason::Unpaid { balance_due })),
        }
    }

    /// Rejects structural edits outside the editable states.
    pub fn ensure_editable(document: &Document) -> Result<(), LifecycleError> {
        if document.is_editable() {
            return Ok(());
        }
        if document.status == DocumentStatus::Finalized {
            return Err(LifecycleError::AlreadyFinalized {
                document_id: document.id,
            });
        }
        Err(precondition(document, LifecycleAction::Edit))
    }

    /// Replaces line items and pricing on an editable document.
    ///
    /// The new lines are validated before they are accepted.
    pub fn replace_line_items(
        document: &Document,
        line_items: Vec<LineItem>,
        gold_rate: Decimal,
        discount_amount: Decimal,
        round_off_amount: Option<Decimal>,
        engine: &ValuationEngine,
    ) -> Result<Document, LifecycleError> {
        Self::ensure_editable(document)?;
        engine
            .compute_document(&line_items, gold_rate, discount_amount, round_off_amount)
            .map_err(|source| LifecycleError::Valuation {
                document_id: document.id,
                source,
            })?;

        let mut updated = document.clone();
        updated.line_items = line_items;
        updated.gold_rate = gold_rate;
        updated.discount_amount = discount_amount;
        updated.round_off_amount = round_off_amount;
        updated.version += 1;
        Ok(updated)
    }
}

pub(crate) fn precondition(document: &Document, action: LifecycleAction) -> LifecycleError {
    LifecycleError::PreconditionFailed {
        document_id: document.id,
        status: document.status,
        action,
    }
}

fn require_fields(document: &Document) -> Result<karat_shared::types::PartyId, LifecycleError> {
    let missing = |field: String| LifecycleError::MissingRequiredField {
        document_id: document.id,
        field,
    };
    let party_id = document.party_id.ok_or_else(|| missing("party_id".into()))?;
    if document.line_items.is_empty() {
        return Err(missing("line_items".into()));
    }
    if document.gold_rate <= Decimal::ZERO {
        return Err(missing("gold_rate".into()));
    }
    for (index, item) in document.line_items.iter().enumerate() {
        if item.category.trim().is_empty() {
            return Err(missing(format!("line_items[{index}].category")));
        }
        if item.description.trim().is_empty() {
            return Err(missing(format!("line_items[{index}].description")));
        }
    }
    Ok(party_id)
}

fn stock_movement(
    item: &LineItem,
    header: SourceRef,
    movement_type: StockMovementType,
    sign: Decimal,
    engine: &ValuationEngine,
) -> StockMovement {
    let qty = i64::from(item.quantity);
    StockMovement {
        movement_type,
        header,
        line_item_id: Some(item.id),
        qty_delta: if sign.is_sign_negative() { -qty } else { qty },
        weight_delta: sign * engine.precision().round_weight(item.valued_weight()),
        purity: STANDARD_VALUATION_PURITY,
        entered_purity: item.purity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::types::LinkedInvoice;
    use crate::valuation::MakingChargeType;
    use chrono::Utc;
    use karat_shared::types::{DocumentId, PartyId, UserId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn ring() -> LineItem {
        LineItem::new("ring", "22K band", 1, dec!(10.000), 916)
            .with_making_charge(MakingChargeType::Flat, dec!(5))
            .with_vat(dec!(5))
    }

    fn draft(kind: DocumentKind) -> Document {
        Document::draft(kind, Some(PartyId::new()), dec!(20), Utc::now()).with_line(ring())
    }

    fn ctx() -> TransitionContext {
        TransitionContext::new(UserId::new())
    }

    #[test]
    fn test_finalize_invoice_emits_effects_in_order() {
        let engine = ValuationEngine::default();
        let doc = draft(DocumentKind::Invoice);
        let ctx = ctx();

        let outcome = LifecycleService::finalize(&doc, &ctx, &engine).unwrap();

        assert_eq!(outcome.document.status, DocumentStatus::Finalized);
        assert_eq!(outcome.document.locked_by, Some(ctx.actor));
        assert_eq!(outcome.document.version, doc.version + 1);
        assert_eq!(outcome.valuation.unwrap().grand_total, dec!(215.250));

        let kinds: Vec<_> = outcome.side_effects.iter().map(SideEffect::kind).collect();
        assert_eq!(kinds, vec!["stock_movement", "balance_posting", "lock_document"]);

        let SideEffect::StockMovement(movement) = &outcome.side_effects[0] else {
            panic!("expected stock movement");
        };
        assert_eq!(movement.movement_type, StockMovementType::SaleOut);
        assert_eq!(movement.weight_delta, dec!(-10.000));
        assert_eq!(movement.qty_delta, -1);

        let SideEffect::BalancePosting(posting) = &outcome.side_effects[1] else {
            panic!("expected balance posting");
        };
        assert_eq!(posting.money_delta, dec!(215.250));
        assert_eq!(posting.reason, PostingReason::InvoiceReceivable);
    }

    #[test]
    fn test_finalize_purchase_books_standard_purity() {
        let engine = ValuationEngine::default();
        let mut doc = Document::draft(DocumentKind::Purchase, Some(PartyId::new()), dec!(20), Utc::now())
            .with_line(LineItem::new("scrap", "old gold", 1, dec!(5.000), 875));
        doc.paid_amount = dec!(40);

        let outcome = LifecycleService::finalize(&doc, &ctx(), &engine).unwrap();

        let SideEffect::StockMovement(movement) = &outcome.side_effects[0] else {
            panic!("expected stock movement");
        };
        assert_eq!(movement.movement_type, StockMovementType::PurchaseIn);
        assert_eq!(movement.purity, 916);
        assert_eq!(movement.entered_purity, 875);
        assert_eq!(movement.weight_delta, dec!(5.000));

        let SideEffect::BalancePosting(posting) = &outcome.side_effects[1] else {
            panic!("expected balance posting");
        };
        assert_eq!(posting.money_delta, dec!(-60.000));
        assert_eq!(posting.reason, PostingReason::PurchasePayable);
    }

    #[test]
    fn test_finalize_fully_paid_skips_posting() {
        let engine = ValuationEngine::default();
        let mut doc = draft(DocumentKind::Invoice);
        doc.paid_amount = dec!(215.250);

        let outcome = LifecycleService::finalize(&doc, &ctx(), &engine).unwrap();
        assert!(
            !outcome
                .side_effects
                .iter()
                .any(|e| matches!(e, SideEffect::BalancePosting(_)))
        );
    }

    #[test]
    fn test_finalize_twice_fails_with_already_finalized() {
        let engine = ValuationEngine::default();
        let first = LifecycleService::finalize(&draft(DocumentKind::Invoice), &ctx(), &engine).unwrap();
        let err = LifecycleService::finalize(&first.document, &ctx(), &engine).unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyFinalized { .. }));
    }

    #[rstest]
    #[case::no_party(|d: &mut Document| d.party_id = None, "party_id")]
    #[case::no_lines(|d: &mut Document| d.line_items.clear(), "line_items")]
    #[case::no_rate(|d: &mut Document| d.gold_rate = Decimal::ZERO, "gold_rate")]
    #[case::blank_category(|d: &mut Document| d.line_items[0].category = " ".into(), "line_items[0].category")]
    fn test_finalize_missing_field(#[case] mutate: fn(&mut Document), #[case] expected: &str) {
        let mut doc = draft(DocumentKind::Invoice);
        mutate(&mut doc);
        let err = LifecycleService::finalize(&doc, &ctx(), &ValuationEngine::default()).unwrap_err();
        match err {
            LifecycleError::MissingRequiredField { field, .. } => assert_eq!(field, expected),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_finalize_invalid_line_reports_valuation_field() {
        let mut doc = draft(DocumentKind::Invoice);
        doc.line_items[0].vat_percent = dec!(120);
        let err = LifecycleService::finalize(&doc, &ctx(), &ValuationEngine::default()).unwrap_err();
        match err {
            LifecycleError::Valuation { source, .. } => assert_eq!(source.field(), "vat_percent"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_finalize_job_card_is_precondition_failure() {
        let doc = draft(DocumentKind::JobCard);
        let err = LifecycleService::finalize(&doc, &ctx(), &ValuationEngine::default()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PreconditionFailed {
                action: LifecycleAction::Finalize,
                ..
            }
        ));
    }

    #[test]
    fn test_job_card_progression() {
        let card = draft(DocumentKind::JobCard);
        let started = LifecycleService::start(&card).unwrap().document;
        assert_eq!(started.status, DocumentStatus::InProgress);
        let completed = LifecycleService::complete(&started).unwrap().document;
        assert_eq!(completed.status, DocumentStatus::Completed);
        assert_eq!(completed.version, card.version + 2);

        assert!(LifecycleService::complete(&card).is_err());
        assert!(LifecycleService::start(&completed).is_err());
    }

    #[rstest]
    #[case(DocumentStatus::Draft, true)]
    #[case(DocumentStatus::InProgress, true)]
    #[case(DocumentStatus::Completed, true)]
    #[case(DocumentStatus::Delivered, false)]
    #[case(DocumentStatus::Cancelled, false)]
    fn test_cancel_from(#[case] status: DocumentStatus, #[case] allowed: bool) {
        let mut card = draft(DocumentKind::JobCard);
        card.status = status;
        assert_eq!(LifecycleService::cancel(&card).is_ok(), allowed);
    }

    fn completed_card(invoice_id: Option<DocumentId>) -> Document {
        let mut card = draft(DocumentKind::JobCard);
        card.status = DocumentStatus::Completed;
        card.converted_invoice_id = invoice_id;
        card
    }

    #[test]
    fn test_deliver_blocked_when_partial() {
        let invoice_id = DocumentId::new();
        let card = completed_card(Some(invoice_id));
        let ctx = ctx().with_linked_invoice(LinkedInvoice {
            invoice_id,
            grand_total: dec!(215.250),
            paid_amount: dec!(199.750),
            status: DocumentStatus::Finalized,
        });

        let err = LifecycleService::deliver(&card, &ctx).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::DeliveryBlocked {
                job_card_id: card.id,
                reason: DeliveryBlockReason::Partial {
                    balance_due: dec!(15.500)
                },
            }
        );
        assert!(err.to_string().starts_with("DeliveryBlocked(partial, 15.500)"));
    }

    #[test]
    fn test_deliver_blocked_when_unpaid_or_missing() {
        let invoice_id = DocumentId::new();
        let unpaid = ctx().with_linked_invoice(LinkedInvoice {
            invoice_id,
            grand_total: dec!(100),
            paid_amount: dec!(0),
            status: DocumentStatus::Finalized,
        });
        let err = LifecycleService::deliver(&completed_card(Some(invoice_id)), &unpaid).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::DeliveryBlocked {
                reason: DeliveryBlockReason::Unpaid { .. },
                ..
            }
        ));

        let err = LifecycleService::deliver(&completed_card(None), &unpaid).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::DeliveryBlocked {
                reason: DeliveryBlockReason::MissingInvoice,
                ..
            }
        ));

        // Snapshot of a different invoice does not count.
        let err = LifecycleService::deliver(&completed_card(Some(DocumentId::new())), &unpaid).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::DeliveryBlocked {
                reason: DeliveryBlockReason::MissingInvoice,
                ..
            }
        ));
    }

    #[test]
    fn test_deliver_treats_removed_invoice_as_missing() {
        let invoice_id = DocumentId::new();
        let ctx = ctx().with_linked_invoice(LinkedInvoice {
            invoice_id,
            grand_total: dec!(200),
            paid_amount: dec!(0),
            status: DocumentStatus::Removed,
        });
        let err = LifecycleService::deliver(&completed_card(Some(invoice_id)), &ctx).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::DeliveryBlocked {
                reason: DeliveryBlockReason::MissingInvoice,
                ..
            }
        ));
    }

    #[test]
    fn test_deliver_when_paid() {
        let invoice_id = DocumentId::new();
        let ctx = ctx().with_linked_invoice(LinkedInvoice {
            invoice_id,
            grand_total: dec!(215.250),
            paid_amount: dec!(215.250),
            status: DocumentStatus::Finalized,
        });
        let outcome = LifecycleService::deliver(&completed_card(Some(invoice_id)), &ctx).unwrap();
        assert_eq!(outcome.document.status, DocumentStatus::Delivered);
        assert!(outcome.side_effects.is_empty());
    }

    #[test]
    fn test_transition_dispatch() {
        let engine = ValuationEngine::default();
        let card = draft(DocumentKind::JobCard);
        let started = LifecycleService::transition(&card, DocumentStatus::InProgress, &ctx(), &engine).unwrap();
        assert_eq!(started.document.status, DocumentStatus::InProgress);

        let err = LifecycleService::transition(&card, DocumentStatus::Removed, &ctx(), &engine).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::PreconditionFailed {
                action: LifecycleAction::Delete,
                ..
            }
        ));

        let invoice = draft(DocumentKind::Invoice);
        let err = LifecycleService::transition(&invoice, DocumentStatus::InProgress, &ctx(), &engine).unwrap_err();
        assert!(matches!(err, LifecycleError::PreconditionFailed { .. }));
    }

    #[test]
    fn test_edit_guard() {
        let engine = ValuationEngine::default();
        let doc = draft(DocumentKind::Invoice);
        let edited = LifecycleService::replace_line_items(
            &doc,
            vec![ring(), ring()],
            dec!(21),
            dec!(1),
            None,
            &engine,
        )
        .unwrap();
        assert_eq!(edited.line_items.len(), 2);
        assert_eq!(edited.version, doc.version + 1);

        let finalized = LifecycleService::finalize(&edited, &ctx(), &engine).unwrap().document;
        let err = LifecycleService::replace_line_items(&finalized, vec![ring()], dec!(20), dec!(0), None, &engine)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyFinalized { .. }));
    }

    #[test]
    fn test_edit_rejects_invalid_lines() {
        let doc = draft(DocumentKind::Invoice);
        let bad = LineItem::new("ring", "x", 0, dec!(1), 916);
        let err = LifecycleService::replace_line_items(
            &doc,
            vec![bad],
            dec!(20),
            dec!(0),
            None,
            &ValuationEngine::default(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "NON_POSITIVE_QUANTITY");
    }
}
