//! Property-based tests for the valuation engine.
//!
//! - Line totals are the exact sum of their parts
//! - Grand totals follow `subtotal − discount + vat_total + round_off`
//! - Repeated recomputation never drifts

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::ValuationEngine;
use super::types::{LineItem, MakingChargeType};

/// Weights from 0.000 g to 1,000.000 g.
fn weight() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|mg| Decimal::new(mg, 3))
}

/// Rates from 0.000 to 100.000 per gram.
fn rate() -> impl Strategy<Value = Decimal> {
    (0i64..100_000i64).prop_map(|baisa| Decimal::new(baisa, 3))
}

/// VAT from 0.00 % to 100.00 %.
fn vat_percent() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|bp| Decimal::new(bp, 2))
}

fn line_item() -> impl Strategy<Value = LineItem> {
    (
        1i32..20,
        weight(),
        1u16..=999,
        prop_oneof![Just(MakingChargeType::Flat), Just(MakingChargeType::PerGram)],
        (0i64..50_000i64).prop_map(|v| Decimal::new(v, 3)),
        vat_percent(),
    )
        .prop_map(|(quantity, weight, purity, charge_type, charge, vat)| {
            LineItem::new("ring", "generated", quantity, weight, purity)
                .with_making_charge(charge_type, charge)
                .with_vat(vat)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* valid line, `line_total == metal_value + making_charges + vat_amount`.
    #[test]
    fn prop_line_total_is_sum_of_parts(item in line_item(), rate in rate()) {
        let line = ValuationEngine::default().compute_line(&item, rate).unwrap();
        prop_assert_eq!(line.line_total, line.metal_value + line.making_charges + line.vat_amount);
        prop_assert_eq!(line.subtotal, line.metal_value + line.making_charges);
    }

    /// *For any* document, the grand total identity holds exactly.
    #[test]
    fn prop_grand_total_identity(
        items in prop::collection::vec(line_item(), 0..8),
        rate in rate(),
        discount in (0i64..10_000i64).prop_map(|v| Decimal::new(v, 3)),
        round_off in (-500i64..500i64).prop_map(|v| Decimal::new(v, 3)),
    ) {
        let doc = ValuationEngine::default()
            .compute_document(&items, rate, discount, Some(round_off))
            .unwrap();
        prop_assert_eq!(doc.grand_total, doc.subtotal - discount + doc.vat_total + round_off);
        let line_sum: Decimal = doc.lines.iter().map(|l| l.subtotal).sum();
        prop_assert_eq!(doc.subtotal, line_sum);
    }

    /// *For any* line, 1,000 recomputations yield the identical result.
    #[test]
    fn prop_recomputation_is_stable(item in line_item(), rate in rate()) {
        let engine = ValuationEngine::default();
        let first = engine.compute_line(&item, rate).unwrap();
        for _ in 0..1_000 {
            let again = engine.compute_line(&item, rate).unwrap();
            prop_assert_eq!(again, first);
            prop_assert_eq!(again.line_total, again.metal_value + again.making_charges + again.vat_amount);
        }
    }

    /// *For any* VAT above 100 %, the engine rejects instead of clamping.
    #[test]
    fn prop_vat_above_hundred_rejected(item in line_item(), excess in 1i64..10_000i64) {
        let item = item.with_vat(Decimal::ONE_HUNDRED + Decimal::new(excess, 2));
        let err = ValuationEngine::default().compute_line(&item, Decimal::ONE).unwrap_err();
        prop_assert_eq!(err.field(), "vat_percent");
    }
}
