//! Valuation engine for line items and documents.
//!
//! Order of operations per line:
//! 1. `metal_value = weight × rate`
//! 2. `making_charges = per_gram ? value × weight : value`
//! 3. `subtotal = metal_value + making_charges`
//! 4. `vat_amount = subtotal × vat_percent / 100`
//! 5. `line_total = subtotal + vat_amount`
//!
//! Steps 1, 2 and 4 are rounded to the money precision; steps 3 and 5 are
//! exact sums of already-rounded parts, so totals never drift.
//!
//! The document discount is deducted after VAT has been computed per line on
//! the undiscounted subtotal.

use karat_shared::types::Precision;
use rust_decimal::Decimal;

use super::error::ValuationError;
use super::types::{DocumentValuation, LineItem, LineValuation, MakingChargeType};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Stateless valuation calculator parameterized by rounding precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValuationEngine {
    precision: Precision,
}

impl ValuationEngine {
    /// Creates an engine rounding with `precision`.
    #[must_use]
    pub const fn new(precision: Precision) -> Self {
        Self { precision }
    }

    /// The rounding precision in use.
    #[must_use]
    pub const fn precision(&self) -> Precision {
        self.precision
    }

    /// Values a single line at `rate` per gram.
    ///
    /// Line-level errors report line index 0; `compute_document` re-targets
    /// them at the real index.
    ///
    /// # Errors
    ///
    /// Returns `ValuationError` for a negative rate or any invalid line field.
    pub fn compute_line(&self, item: &LineItem, rate: Decimal) -> Result<LineValuation, ValuationError> {
        Self::validate_rate(rate)?;
        Self::validate_item(item)?;

        let overflow = |field| ValuationError::Overflow {
            line: Some(0),
            field,
        };
        let weight = item.valued_weight();
        let metal_value = weight
            .checked_mul(rate)
            .map(|v| self.precision.round_money(v))
            .ok_or_else(|| overflow("metal_value"))?;
        let making_charges = match item.making_charge_type {
            MakingChargeType::PerGram => item.making_charge_value.checked_mul(weight),
            MakingChargeType::Flat => Some(item.making_charge_value),
        }
        .map(|v| self.precision.round_money(v))
        .ok_or_else(|| overflow("making_charges"))?;
        let subtotal = metal_value
            .checked_add(making_charges)
            .ok_or_else(|| overflow("subtotal"))?;
        let vat_amount = subtotal
            .checked_mul(item.vat_percent)
            .and_then(|v| v.checked_div(HUNDRED))
            .map(|v| self.precision.round_money(v))
            .ok_or_else(|| overflow("vat_amount"))?;
        let line_total = subtotal
            .checked_add(vat_amount)
            .ok_or_else(|| overflow("line_total"))?;

        Ok(LineValuation {
            weight,
            metal_value,
            making_charges,
            subtotal,
            vat_amount,
            line_total,
        })
    }

    /// Values a whole document.
    ///
    /// `round_off` is a signed manual adjustment; `None` means zero.
    ///
    /// # Errors
    ///
    /// Returns the first `ValuationError` found, in line order, after the
    /// document-level rate and discount checks.
    pub fn compute_document(
        &self,
        items: &[LineItem],
        rate: Decimal,
        discount: Decimal,
        round_off: Option<Decimal>,
    ) -> Result<DocumentValuation, ValuationError> {
        Self::validate_rate(rate)?;
        if discount < Decimal::ZERO {
            return Err(ValuationError::NegativeDiscount(discount));
        }

        let lines = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.compute_line(item, rate)
                    .map_err(|err| err.at_line(index))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let subtotal = checked_sum(lines.iter().map(|l| l.subtotal), "subtotal")?;
        let vat_total = checked_sum(lines.iter().map(|l| l.vat_amount), "vat_total")?;
        let net_weight = checked_sum(lines.iter().map(|l| l.weight), "net_weight")?;
        let total_quantity: i64 = items.iter().map(|i| i64::from(i.quantity)).sum();
        let round_off_amount = round_off.unwrap_or(Decimal::ZERO);
        let grand_total = subtotal
            .checked_sub(discount)
            .and_then(|v| v.checked_add(vat_total))
            .and_then(|v| v.checked_add(round_off_amount))
            .ok_or(ValuationError::Overflow {
                line: None,
                field: "grand_total",
            })?;

        Ok(DocumentValuation {
            grand_total,
            lines,
            subtotal,
            discount_amount: discount,
            vat_total,
            round_off_amount,
            net_weight,
            total_quantity,
        })
    }

    fn validate_rate(rate: Decimal) -> Result<(), ValuationError> {
        if rate < Decimal::ZERO {
            return Err(ValuationError::NegativeRate(rate));
        }
        Ok(())
    }

    fn validate_item(item: &LineItem) -> Result<(), ValuationError> {
        if item.quantity <= 0 {
            return Err(ValuationError::NonPositiveQuantity {
                line: 0,
                value: item.quantity,
            });
        }
        if item.weight_in < Decimal::ZERO {
            return Err(ValuationError::NegativeWeight {
                line: 0,
                field: "weight_in",
                value: item.weight_in,
            });
        }
        if let Some(weight_out) = item.weight_out
            && weight_out < Decimal::ZERO
        {
            return Err(ValuationError::NegativeWeight {
                line: 0,
                field: "weight_out",
                value: weight_out,
            });
        }
        if !(1..=999).contains(&item.purity) {
            return Err(ValuationError::PurityOutOfRange {
                line: 0,
                value: item.purity,
            });
        }
        if item.making_charge_value < Decimal::ZERO {
            return Err(ValuationError::NegativeMakingCharge {
                line: 0,
                value: item.making_charge_value,
            });
        }
        if item.vat_percent < Decimal::ZERO || item.vat_percent > HUNDRED {
            return Err(ValuationError::VatOutOfRange {
                line: 0,
                value: item.vat_percent,
            });
        }
        Ok(())
    }
}

fn checked_sum(
    mut values: impl Iterator<Item = Decimal>,
    field: &'static str,
) -> Result<Decimal, ValuationError> {
    values
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or(ValuationError::Overflow { line: None, field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn engine() -> ValuationEngine {
        ValuationEngine::default()
    }

    fn ring() -> LineItem {
        LineItem::new("ring", "22K band", 1, dec!(10.000), 916)
            .with_making_charge(MakingChargeType::Flat, dec!(5))
            .with_vat(dec!(5))
    }

    #[test]
    fn test_reference_line() {
        let line = engine().compute_line(&ring(), dec!(20)).unwrap();
        assert_eq!(line.metal_value, dec!(200.000));
        assert_eq!(line.making_charges, dec!(5.000));
        assert_eq!(line.subtotal, dec!(205.000));
        assert_eq!(line.vat_amount, dec!(10.250));
        assert_eq!(line.line_total, dec!(215.250));
        assert_eq!(line.line_total.to_string(), "215.250");
    }

    #[test]
    fn test_per_gram_making_charge() {
        let item = LineItem::new("chain", "rope chain", 1, dec!(12.345), 916)
            .with_making_charge(MakingChargeType::PerGram, dec!(1.5));
        let line = engine().compute_line(&item, dec!(24.125)).unwrap();
        // 12.345 × 24.125 = 297.823125
        assert_eq!(line.metal_value, dec!(297.823));
        // 12.345 × 1.5 = 18.5175
        assert_eq!(line.making_charges, dec!(18.518));
        assert_eq!(line.subtotal, dec!(316.341));
        assert_eq!(line.vat_amount, Decimal::ZERO);
    }

    #[test]
    fn test_weight_out_is_valued() {
        let item = ring().with_weight_out(dec!(9.500));
        let line = engine().compute_line(&item, dec!(20)).unwrap();
        assert_eq!(line.weight, dec!(9.500));
        assert_eq!(line.metal_value, dec!(190.000));
    }

    #[test]
    fn test_vat_ignores_discount() {
        let doc = engine()
            .compute_document(&[ring()], dec!(20), dec!(15), None)
            .unwrap();
        assert_eq!(doc.vat_total, dec!(10.250));
        assert_eq!(doc.grand_total, dec!(200.250));
    }

    #[test]
    fn test_document_totals_with_round_off() {
        let items = vec![ring(), ring().with_vat(Decimal::ZERO)];
        let doc = engine()
            .compute_document(&items, dec!(20), dec!(10), Some(dec!(-0.250)))
            .unwrap();
        assert_eq!(doc.subtotal, dec!(410.000));
        assert_eq!(doc.vat_total, dec!(10.250));
        assert_eq!(doc.grand_total, dec!(410.000));
        assert_eq!(doc.net_weight, dec!(20.000));
        assert_eq!(doc.total_quantity, 2);
    }

    #[test]
    fn test_empty_document_is_zero() {
        let doc = engine()
            .compute_document(&[], dec!(20), Decimal::ZERO, None)
            .unwrap();
        assert_eq!(doc.grand_total, Decimal::ZERO);
        assert!(doc.lines.is_empty());
    }

    #[test]
    fn test_two_place_precision() {
        let engine = ValuationEngine::new(Precision::new(2, 3));
        let item = LineItem::new("coin", "sovereign", 1, dec!(7.988), 916).with_vat(dec!(5));
        let line = engine.compute_line(&item, dec!(25.37)).unwrap();
        // 7.988 × 25.37 = 202.65556
        assert_eq!(line.metal_value, dec!(202.66));
        assert_eq!(line.vat_amount, dec!(10.13));
    }

    #[rstest]
    #[case(ring().with_vat(dec!(100.001)), "vat_percent")]
    #[case(ring().with_vat(dec!(-1)), "vat_percent")]
    #[case(LineItem { quantity: 0, ..ring() }, "quantity")]
    #[case(LineItem { quantity: -2, ..ring() }, "quantity")]
    #[case(LineItem { weight_in: dec!(-0.001), ..ring() }, "weight_in")]
    #[case(ring().with_weight_out(dec!(-1)), "weight_out")]
    #[case(LineItem { purity: 0, ..ring() }, "purity")]
    #[case(LineItem { purity: 1000, ..ring() }, "purity")]
    #[case(ring().with_making_charge(MakingChargeType::Flat, dec!(-5)), "making_charge_value")]
    fn test_invalid_line_names_field(#[case] item: LineItem, #[case] field: &str) {
        let err = engine().compute_line(&item, dec!(20)).unwrap_err();
        assert_eq!(err.field(), field);
    }

    #[test]
    fn test_vat_boundaries_accepted() {
        assert!(engine().compute_line(&ring().with_vat(dec!(0)), dec!(20)).is_ok());
        assert!(engine().compute_line(&ring().with_vat(dec!(100)), dec!(20)).is_ok());
    }

    #[test]
    fn test_line_overflow_is_an_error() {
        let item = LineItem::new("bar", "oversized", 1, dec!(100000000000000000000), 916);
        let err = engine().compute_line(&item, dec!(10000000000)).unwrap_err();
        assert_eq!(
            err,
            ValuationError::Overflow {
                line: Some(0),
                field: "metal_value",
            }
        );

        let item = LineItem::new("bar", "oversized", 1, dec!(2), 916)
            .with_making_charge(MakingChargeType::PerGram, Decimal::MAX);
        let err = engine().compute_line(&item, dec!(0)).unwrap_err();
        assert_eq!(err.field(), "making_charges");
    }

    #[test]
    fn test_document_overflow_names_total() {
        let big = LineItem::new("bar", "oversized", 1, dec!(1), 916)
            .with_making_charge(MakingChargeType::Flat, Decimal::MAX);
        let err = engine()
            .compute_document(&[ring(), big], dec!(20), Decimal::ZERO, None)
            .unwrap_err();
        assert_eq!(
            err,
            ValuationError::Overflow {
                line: Some(1),
                field: "subtotal",
            }
        );

        let near_max = LineItem::new("bar", "near max", 1, dec!(1), 916)
            .with_making_charge(MakingChargeType::Flat, Decimal::MAX - dec!(1000));
        let err = engine()
            .compute_document(&[near_max], dec!(0), Decimal::ZERO, Some(dec!(2000)))
            .unwrap_err();
        assert_eq!(err.line(), None);
        assert_eq!(err.field(), "grand_total");
    }

    #[test]
    fn test_negative_rate_rejected() {
        let err = engine().compute_line(&ring(), dec!(-0.01)).unwrap_err();
        assert_eq!(err, ValuationError::NegativeRate(dec!(-0.01)));
    }

    #[test]
    fn test_negative_discount_rejected() {
        let err = engine()
            .compute_document(&[ring()], dec!(20), dec!(-1), None)
            .unwrap_err();
        assert_eq!(err.field(), "discount_amount");
    }

    #[test]
    fn test_document_error_reports_line_index() {
        let items = vec![ring(), ring(), ring().with_vat(dec!(150))];
        let err = engine()
            .compute_document(&items, dec!(20), Decimal::ZERO, None)
            .unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.field(), "vat_percent");
    }
}
