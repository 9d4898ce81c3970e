//! Property-based tests for the lifecycle service.
//!
//! - Finalize succeeds at most once per document
//! - Delivery is blocked whenever the linked invoice has a balance due
//! - No transition leaves the allowed table

use chrono::Utc;
use karat_shared::types::{DocumentId, PartyId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::document::Document;
use super::error::{DeliveryBlockReason, LifecycleError};
use super::service::LifecycleService;
use super::types::{DocumentKind, DocumentStatus, LinkedInvoice, TransitionContext};
use crate::effects::SideEffect;
use crate::valuation::{LineItem, ValuationEngine};

fn arb_kind() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::JobCard),
        Just(DocumentKind::Invoice),
        Just(DocumentKind::Purchase),
    ]
}

fn arb_status() -> impl Strategy<Value = DocumentStatus> {
    prop_oneof![
        Just(DocumentStatus::Draft),
        Just(DocumentStatus::InProgress),
        Just(DocumentStatus::Completed),
        Just(DocumentStatus::Delivered),
        Just(DocumentStatus::Finalized),
        Just(DocumentStatus::Cancelled),
        Just(DocumentStatus::Removed),
    ]
}

/// Money from 0.001 to 10,000.000.
fn arb_money() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|baisa| Decimal::new(baisa, 3))
}

fn arb_document(kind: DocumentKind) -> impl Strategy<Value = Document> {
    prop::collection::vec((1i32..5, 1i64..100_000i64, 1u16..=999), 1..5).prop_map(move |lines| {
        let mut doc = Document::draft(kind, Some(PartyId::new()), Decimal::new(25_500, 3), Utc::now());
        for (qty, mg, purity) in lines {
            doc = doc.with_line(LineItem::new("chain", "generated", qty, Decimal::new(mg, 3), purity));
        }
        doc
    })
}

fn allowed(kind: DocumentKind, from: DocumentStatus, to: DocumentStatus) -> bool {
    use DocumentStatus as S;
    match kind {
        DocumentKind::Invoice | DocumentKind::Purchase => from == S::Draft && to == S::Finalized,
        DocumentKind::JobCard => matches!(
            (from, to),
            (S::Draft, S::InProgress)
                | (S::InProgress, S::Completed)
                | (S::Completed, S::Delivered)
                | (S::Draft | S::InProgress | S::Completed, S::Cancelled)
        ),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Finalizing the result of a finalize fails and emits nothing.
    #[test]
    fn prop_finalize_succeeds_once(doc in prop_oneof![
        arb_document(DocumentKind::Invoice),
        arb_document(DocumentKind::Purchase),
    ]) {
        let engine = ValuationEngine::default();
        let ctx = TransitionContext::new(UserId::new());

        let first = LifecycleService::finalize(&doc, &ctx, &engine).unwrap();
        let locks = first
            .side_effects
            .iter()
            .filter(|e| matches!(e, SideEffect::LockDocument { .. }))
            .count();
        prop_assert_eq!(locks, 1);

        let second = LifecycleService::finalize(&first.document, &ctx, &engine);
        prop_assert!(
            matches!(second, Err(LifecycleError::AlreadyFinalized { .. })),
            "expected AlreadyFinalized"
        );
    }

    /// Any balance due on the linked invoice blocks delivery.
    #[test]
    fn prop_delivery_blocked_while_balance_due(grand in arb_money(), paid_fraction in 0u32..100) {
        let paid = grand * Decimal::from(paid_fraction) / Decimal::ONE_HUNDRED;
        prop_assume!(grand - paid > Decimal::ZERO);

        let invoice_id = DocumentId::new();
        let mut card = Document::draft(DocumentKind::JobCard, Some(PartyId::new()), Decimal::ONE, Utc::now());
        card.status = DocumentStatus::Completed;
        card.converted_invoice_id = Some(invoice_id);
        let ctx = TransitionContext::new(UserId::new()).with_linked_invoice(LinkedInvoice {
            invoice_id,
            grand_total: grand,
            paid_amount: paid,
            status: DocumentStatus::Finalized,
        });

        match LifecycleService::deliver(&card, &ctx) {
            Err(LifecycleError::DeliveryBlocked { reason, .. }) => {
                prop_assert_eq!(reason.balance_due(), Some(grand - paid));
                if paid.is_zero() {
                    let is_unpaid = matches!(reason, DeliveryBlockReason::Unpaid { .. });
                    prop_assert!(is_unpaid);
                } else {
                    let is_partial = matches!(reason, DeliveryBlockReason::Partial { .. });
                    prop_assert!(is_partial);
                }
            }
            other => prop_assert!(false, "expected DeliveryBlocked, got {:?}", other),
        }
    }

    /// A successful transition is always in the allowed table.
    #[test]
    fn prop_transitions_stay_in_table(
        kind in arb_kind(),
        from in arb_status(),
        to in arb_status(),
    ) {
        let engine = ValuationEngine::default();
        let invoice_id = DocumentId::new();
        let mut doc = Document::draft(kind, Some(PartyId::new()), Decimal::ONE, Utc::now())
            .with_line(LineItem::new("ring", "generated", 1, Decimal::ONE, 916));
        doc.status = from;
        doc.converted_invoice_id = Some(invoice_id);
        let ctx = TransitionContext::new(UserId::new()).with_linked_invoice(LinkedInvoice {
            invoice_id,
            grand_total: Decimal::ONE,
            paid_amount: Decimal::ONE,
            status: DocumentStatus::Finalized,
        });

        match LifecycleService::transition(&doc, to, &ctx, &engine) {
            Ok(outcome) => {
                prop_assert!(allowed(kind, from, to));
                prop_assert_eq!(outcome.document.status, to);
                prop_assert_eq!(outcome.document.version, doc.version + 1);
            }
            Err(_) => prop_assert!(!allowed(kind, from, to)),
        }
    }
}
