//! End-to-end back office workflows.
//!
//! Purchases, payments and purchase returns flowing through the store and
//! into the collaborators, plus manual sale returns.

use chrono::Utc;
use karat_core::effects::{PaymentMode, TransactionType};
use karat_core::lifecycle::{Document, DocumentKind, DocumentStatus, PaymentRequest};
use karat_core::returns::{
    NewReturn, RefundDetails, ReturnItem, ReturnReference, ReturnStatus, ReturnType, ReturnsError,
};
use karat_core::valuation::LineItem;
use karat_shared::types::{AccountId, PartyId, UserId};
use karat_store::{BackOffice, StoreError};
use rstest::{fixture, rstest};
use rust_decimal_macros::dec;

#[fixture]
fn office() -> BackOffice {
    BackOffice::default()
}

fn finalized_purchase(office: &BackOffice, vendor: PartyId) -> Document {
    let doc = Document::draft(DocumentKind::Purchase, Some(vendor), dec!(20), Utc::now())
        .with_line(LineItem::new("scrap", "old chains", 2, dec!(100.000), 916));
    office.insert_document(doc.clone()).unwrap();
    office.finalize(doc.id, UserId::new()).unwrap().document
}

#[rstest]
fn test_purchase_payment_and_gold_return(office: BackOffice) {
    let vendor = PartyId::new();
    let purchase = finalized_purchase(&office, vendor);
    let line = purchase.line_items[0].id;
    let account = AccountId::new();

    let paid = office
        .apply_payment(
            purchase.id,
            PaymentRequest {
                amount: dec!(500),
                account_id: account,
                mode: PaymentMode::BankTransfer,
            },
        )
        .unwrap();
    assert_eq!(paid.balance_due, dec!(1500.000));

    let ret = office
        .create_return(NewReturn {
            return_type: ReturnType::PurchaseReturn,
            reference: ReturnReference::purchase(purchase.id),
            party_id: vendor,
            items: vec![ReturnItem::linked(line, 1, dec!(40.000), dec!(800))],
            refund: RefundDetails::gold(dec!(40.000), 916),
        })
        .unwrap();
    let done = office.finalize_return(ret.id, UserId::new()).unwrap();
    assert_eq!(done.ret.status, ReturnStatus::Finalized);
    assert_eq!(done.settlement.gold_grams, dec!(40.000));

    let remaining = office.remaining(purchase.id).unwrap();
    assert_eq!(remaining[&line].qty, 1);
    assert_eq!(remaining[&line].weight, dec!(60.000));

    let collaborators = office.collaborators().unwrap();
    // Purchase returns settle through the ledger only.
    assert_eq!(collaborators.inventory.level(916).weight, dec!(100.000));
    let balance = collaborators.ledger.balance(vendor);
    assert_eq!(balance.money, dec!(-1500.000));
    assert_eq!(balance.gold, dec!(40.000));
    assert_eq!(collaborators.journal.account_balance(account), dec!(-500));
}

#[rstest]
fn test_purchase_return_over_remaining_rejected(office: BackOffice) {
    let vendor = PartyId::new();
    let purchase = finalized_purchase(&office, vendor);
    let line = purchase.line_items[0].id;

    let err = office
        .create_return(NewReturn {
            return_type: ReturnType::PurchaseReturn,
            reference: ReturnReference::purchase(purchase.id),
            party_id: vendor,
            items: vec![
                ReturnItem::linked(line, 1, dec!(60.000), dec!(100)),
                ReturnItem::linked(line, 1, dec!(60.000), dec!(100)),
            ],
            refund: RefundDetails::gold(dec!(1), 916),
        })
        .unwrap_err();

    let StoreError::Returns(ReturnsError::RemainingExceeded { rejected, .. }) = err else {
        panic!("expected RemainingExceeded, got {err:?}");
    };
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].reason.to_string().contains("40"));
}

#[rstest]
fn test_sale_return_against_purchase_rejected(office: BackOffice) {
    let vendor = PartyId::new();
    let purchase = finalized_purchase(&office, vendor);

    let err = office
        .create_return(NewReturn {
            return_type: ReturnType::SaleReturn,
            reference: ReturnReference::purchase(purchase.id),
            party_id: vendor,
            items: vec![ReturnItem::linked(purchase.line_items[0].id, 1, dec!(1), dec!(1))],
            refund: RefundDetails::money(dec!(1), AccountId::new()),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Returns(ReturnsError::ReferenceMismatch { .. })
    ));
    assert_eq!(err.status_code(), 400);
}

#[rstest]
fn test_manual_sale_return_refunds_money(office: BackOffice) {
    let customer = PartyId::new();
    let account = AccountId::new();

    let ret = office
        .create_return(NewReturn {
            return_type: ReturnType::SaleReturn,
            reference: ReturnReference::manual(),
            party_id: customer,
            items: vec![ReturnItem::manual("walk-in ring", 1, dec!(4.200), dec!(90))],
            refund: RefundDetails::money(dec!(90), account),
        })
        .unwrap();
    let done = office.finalize_return(ret.id, UserId::new()).unwrap();

    let collaborators = office.collaborators().unwrap();
    let record = &collaborators.journal.records()[0];
    assert_eq!(record.transaction_type, TransactionType::Debit);
    assert_eq!(collaborators.journal.account_balance(account), dec!(-90));
    assert_eq!(collaborators.inventory.level(916).weight, dec!(4.200));
    assert_eq!(done.settlement.totals.qty, 1);
}

#[rstest]
fn test_job_card_to_delivery(office: BackOffice) {
    let actor = UserId::new();
    let card = Document::draft(DocumentKind::JobCard, Some(PartyId::new()), dec!(20), Utc::now())
        .with_line(LineItem::new("chain", "resize", 1, dec!(12.000), 916).with_weight_out(dec!(11.500)));
    office.insert_document(card.clone()).unwrap();

    office.transition(card.id, DocumentStatus::InProgress, actor).unwrap();
    office.transition(card.id, DocumentStatus::Completed, actor).unwrap();
    let invoice = office.convert_job_card(card.id).unwrap().invoice;
    assert_eq!(invoice.source_job_card_id, Some(card.id));

    let finalized = office.finalize(invoice.id, actor).unwrap();
    let total = finalized.valuation.unwrap().grand_total;
    assert_eq!(total, dec!(230.000));

    office
        .apply_payment(
            invoice.id,
            PaymentRequest {
                amount: total,
                account_id: AccountId::new(),
                mode: PaymentMode::Cash,
            },
        )
        .unwrap();
    let delivered = office.transition(card.id, DocumentStatus::Delivered, actor).unwrap();
    assert_eq!(delivered.document.status, DocumentStatus::Delivered);

    // A converted card cannot be deleted.
    let impact = office.deletion_impact(card.id).unwrap();
    assert!(!impact.is_deletable());
}
