//! Decimal precision rules for money and gold weights.
//!
//! CRITICAL: Never use floating-point for money or weight calculations.
//! Every amount is a `rust_decimal::Decimal` rounded with these rules.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Default number of decimal places for money (OMR uses baisa, 1/1000).
pub const DEFAULT_MONEY_DECIMAL_PLACES: u32 = 3;

/// Default number of decimal places for weights in grams (milligram resolution).
pub const DEFAULT_WEIGHT_DECIMAL_PLACES: u32 = 3;

/// Rounding precision applied to derived money and weight figures.
///
/// Rounding is half away from zero, the convention used on printed
/// jewellery invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    /// Decimal places kept on money amounts.
    #[serde(default = "default_money_dp")]
    pub money_dp: u32,
    /// Decimal places kept on weights.
    #[serde(default = "default_weight_dp")]
    pub weight_dp: u32,
}

fn default_money_dp() -> u32 {
    DEFAULT_MONEY_DECIMAL_PLACES
}

fn default_weight_dp() -> u32 {
    DEFAULT_WEIGHT_DECIMAL_PLACES
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            money_dp: DEFAULT_MONEY_DECIMAL_PLACES,
            weight_dp: DEFAULT_WEIGHT_DECIMAL_PLACES,
        }
    }
}

impl Precision {
    /// Creates a precision with explicit money and weight decimal places.
    #[must_use]
    pub const fn new(money_dp: u32, weight_dp: u32) -> Self {
        Self {
            money_dp,
            weight_dp,
        }
    }

    /// Rounds a money amount to exactly `money_dp` places.
    #[must_use]
    pub fn round_money(&self, amount: Decimal) -> Decimal {
        fixed(amount, self.money_dp)
    }

    /// Rounds a weight to exactly `weight_dp` places.
    #[must_use]
    pub fn round_weight(&self, grams: Decimal) -> Decimal {
        fixed(grams, self.weight_dp)
    }

    /// The smallest representable money unit (e.g. 0.001 for OMR).
    #[must_use]
    pub fn money_unit(&self) -> Decimal {
        Decimal::new(1, self.money_dp)
    }
}

/// Rounds half away from zero, then pads the scale so `5` prints as `5.000`.
fn fixed(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}
