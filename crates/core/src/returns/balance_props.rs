//! Property-based tests for remaining balances.
//!
//! - Remaining never increases as returns accumulate and never goes negative
//! - Accepted batches never return more than the original line

use chrono::Utc;
use karat_shared::types::{PartyId, ReturnId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{compute_remaining, validate_return_items};
use super::types::{RefundDetails, Return, ReturnItem, ReturnReference, ReturnStatus, ReturnType};
use crate::lifecycle::{Document, DocumentKind};
use crate::valuation::{LineItem, ValuationEngine};

fn source() -> Document {
    Document::draft(DocumentKind::Invoice, Some(PartyId::new()), Decimal::new(21_750, 3), Utc::now())
        .with_line(LineItem::new("ring", "band", 4, Decimal::new(12_000, 3), 916))
        .with_line(LineItem::new("chain", "rope", 2, Decimal::new(7_250, 3), 916))
}

/// (line index, qty, weight in mg, finalized?)
fn arb_requests() -> impl Strategy<Value = Vec<(usize, u32, i64, bool)>> {
    prop::collection::vec((0usize..2, 0u32..4, 0i64..8_000, any::<bool>()), 1..12)
}

fn wrap(source: &Document, item: ReturnItem, finalized: bool) -> Return {
    Return {
        id: ReturnId::new(),
        return_type: ReturnType::SaleReturn,
        reference: ReturnReference::invoice(source.id),
        party_id: PartyId::new(),
        status: if finalized { ReturnStatus::Finalized } else { ReturnStatus::Draft },
        items: vec![item],
        refund: RefundDetails::default(),
        created_at: Utc::now(),
        finalized_at: None,
        finalized_by: None,
        version: 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Adding any return never raises a remaining balance, and none goes negative.
    #[test]
    fn prop_remaining_non_increasing(requests in arb_requests()) {
        let engine = ValuationEngine::default();
        let source = source();
        let mut returns = Vec::new();
        let mut previous = compute_remaining(&source, &returns, None, &engine).unwrap();

        for (line, qty, mg, finalized) in requests {
            let item = ReturnItem::linked(source.line_items[line].id, qty, Decimal::new(mg, 3), Decimal::new(mg, 2));
            returns.push(wrap(&source, item, finalized));
            let next = compute_remaining(&source, &returns, None, &engine).unwrap();
            for (id, balance) in &next {
                let before = &previous[id];
                prop_assert!(balance.qty <= before.qty);
                prop_assert!(balance.weight <= before.weight);
                prop_assert!(balance.amount <= before.amount);
                prop_assert!(balance.qty >= 0);
                prop_assert!(balance.weight >= Decimal::ZERO);
                prop_assert!(balance.amount >= Decimal::ZERO);
            }
            previous = next;
        }
    }

    /// Returns accepted one by one never exceed the original line.
    #[test]
    fn prop_accepted_returns_fit_original(requests in arb_requests()) {
        let engine = ValuationEngine::default();
        let source = source();
        let mut accepted: Vec<Return> = Vec::new();

        for (line, qty, mg, finalized) in requests {
            let item = ReturnItem::linked(source.line_items[line].id, qty, Decimal::new(mg, 3), Decimal::ZERO);
            let remaining = compute_remaining(&source, &accepted, None, &engine).unwrap();
            if validate_return_items(&remaining, std::slice::from_ref(&item)).is_ok() {
                accepted.push(wrap(&source, item, finalized));
            }
        }

        for line in &source.line_items {
            let (qty, weight) = accepted
                .iter()
                .flat_map(|ret| ret.items.iter())
                .filter(|item| item.source_item_id == Some(line.id))
                .fold((0i64, Decimal::ZERO), |(q, w), item| (q + i64::from(item.qty), w + item.weight_grams));
            prop_assert!(qty <= i64::from(line.quantity));
            prop_assert!(weight <= line.weight_in);
        }
    }
}
