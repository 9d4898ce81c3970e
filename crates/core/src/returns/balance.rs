//! Remaining returnable balance per source line.
//!
//! Balances are derived from the full set of returns every time they are
//! needed. Drafts reserve balance alongside finalized returns so that two
//! drafts cannot both claim the same goods.

use std::collections::{BTreeMap, HashMap};

use karat_shared::types::{LineItemId, ReturnId};
use rust_decimal::Decimal;

use super::error::{RejectedItem, RejectionReason, ReturnsError};
use super::types::{ItemOrigin, RemainingBalance, Return, ReturnItem};
use crate::lifecycle::Document;
use crate::valuation::ValuationEngine;

/// Computes what is still returnable on each line of `source`.
///
/// Every return in `returns` that references `source` counts, whatever its
/// status, except `exclude` (the draft being re-validated).
pub fn compute_remaining(
    source: &Document,
    returns: &[Return],
    exclude: Option<ReturnId>,
    engine: &ValuationEngine,
) -> Result<BTreeMap<LineItemId, RemainingBalance>, ReturnsError> {
    let precision = engine.precision();
    let mut balances = BTreeMap::new();
    for (index, item) in source.line_items.iter().enumerate() {
        let line = engine
            .compute_line(item, source.gold_rate)
            .map_err(|err| ReturnsError::Valuation {
                document_id: source.id,
                source: err.at_line(index),
            })?;
        let weight = precision.round_weight(item.valued_weight());
        balances.insert(
            item.id,
            RemainingBalance {
                line_item_id: item.id,
                original_qty: i64::from(item.quantity),
                original_weight: weight,
                original_amount: line.line_total,
                qty: i64::from(item.quantity),
                weight,
                amount: line.line_total,
            },
        );
    }

    let consumed = returns
        .iter()
        .filter(|ret| ret.references(source.id) && Some(ret.id) != exclude)
        .flat_map(|ret| ret.items.iter());
    for item in consumed {
        let Some(balance) = item.source_item_id.and_then(|id| balances.get_mut(&id)) else {
            continue;
        };
        balance.qty -= i64::from(item.qty);
        balance.weight -= item.weight_grams;
        balance.amount -= item.amount;
    }

    for balance in balances.values_mut() {
        balance.qty = balance.qty.max(0);
        balance.weight = balance.weight.max(Decimal::ZERO);
        balance.amount = balance.amount.max(Decimal::ZERO);
    }
    Ok(balances)
}

/// Checks requested items against `remaining`.
///
/// Manual items are not capped. Requests for the same source line
/// accumulate in order, so a later item's allowed maximum is what the
/// earlier items left. Quantity and weight are checked independently and
/// every violation is reported.
pub fn validate_return_items(
    remaining: &BTreeMap<LineItemId, RemainingBalance>,
    requested: &[ReturnItem],
) -> Result<(), Vec<RejectedItem>> {
    let mut claimed: HashMap<LineItemId, (i64, Decimal)> = HashMap::new();
    let mut rejected = Vec::new();

    for item in requested {
        let Some(source_item_id) = item.source_item_id else {
            continue;
        };
        let reject = |reason| RejectedItem {
            item_id: item.id,
            source_item_id,
            reason,
        };
        let Some(balance) = remaining.get(&source_item_id) else {
            rejected.push(reject(RejectionReason::UnknownSourceItem));
            continue;
        };

        let (claimed_qty, claimed_weight) = claimed.entry(source_item_id).or_default();
        let qty = i64::from(item.qty);
        let allowed_qty = (balance.qty - *claimed_qty).max(0);
        let allowed_weight = (balance.weight - *claimed_weight).max(Decimal::ZERO);

        if qty > allowed_qty {
            rejected.push(reject(RejectionReason::QtyExceeded {
                requested: qty,
                allowed_max: allowed_qty,
            }));
        }
        if item.weight_grams > allowed_weight {
            rejected.push(reject(RejectionReason::WeightExceeded {
                requested: item.weight_grams,
                allowed_max: allowed_weight,
            }));
        }
        *claimed_qty += qty;
        *claimed_weight += item.weight_grams;
    }

    if rejected.is_empty() {
        Ok(())
    } else {
        Err(rejected)
    }
}

/// Rejects negative values and items that return nothing.
pub fn validate_item_values(items: &[ReturnItem]) -> Result<(), ReturnsError> {
    for item in items {
        let invalid = |field, reason| ReturnsError::InvalidItem {
            item_id: item.id,
            field,
            reason,
        };
        if item.weight_grams < Decimal::ZERO {
            return Err(invalid("weight_grams", "must not be negative"));
        }
        if item.amount < Decimal::ZERO {
            return Err(invalid("amount", "must not be negative"));
        }
        if item.qty == 0 && item.weight_grams.is_zero() {
            return Err(invalid("qty", "and weight_grams must not both be zero"));
        }
        if item.origin() == ItemOrigin::Manual && item.description.trim().is_empty() {
            return Err(invalid("description", "is required for manual items"));
        }
    }
    Ok(())
}
