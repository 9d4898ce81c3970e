//! Valuation domain types.
//!
//! Line items are the shared input of job cards, invoices and purchases.
//! Valuation results are derived on demand and never stored on their own.

use karat_shared::types::LineItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the making charge of a line is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MakingChargeType {
    /// A fixed amount for the whole line.
    Flat,
    /// An amount per gram of valued weight.
    PerGram,
}

impl MakingChargeType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::PerGram => "per_gram",
        }
    }
}

impl fmt::Display for MakingChargeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line on a job card, invoice or purchase.
///
/// `weight_out <= weight_in` is domain data and is not enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line identifier, referenced by return items.
    pub id: LineItemId,
    /// Item category (ring, chain, bangle, ...).
    pub category: String,
    /// Free-text description.
    pub description: String,
    /// Number of pieces; must be positive.
    pub quantity: i32,
    /// Gross weight received, in grams.
    pub weight_in: Decimal,
    /// Finished weight, in grams, when known.
    #[serde(default)]
    pub weight_out: Option<Decimal>,
    /// Declared fineness (916 = 22K), 1 to 999.
    pub purity: u16,
    /// Making charge pricing policy.
    pub making_charge_type: MakingChargeType,
    /// Making charge amount (flat) or rate (per gram).
    pub making_charge_value: Decimal,
    /// VAT percent applied to metal value plus making charges.
    pub vat_percent: Decimal,
}

impl LineItem {
    /// Creates a line with no making charge and no VAT.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        description: impl Into<String>,
        quantity: i32,
        weight_in: Decimal,
        purity: u16,
    ) -> Self {
        Self {
            id: LineItemId::new(),
            category: category.into(),
            description: description.into(),
            quantity,
            weight_in,
            weight_out: None,
            purity,
            making_charge_type: MakingChargeType::Flat,
            making_charge_value: Decimal::ZERO,
            vat_percent: Decimal::ZERO,
        }
    }

    /// Sets the making charge policy.
    #[must_use]
    pub fn with_making_charge(mut self, charge_type: MakingChargeType, value: Decimal) -> Self {
        self.making_charge_type = charge_type;
        self.making_charge_value = value;
        self
    }

    /// Sets the VAT percent.
    #[must_use]
    pub fn with_vat(mut self, vat_percent: Decimal) -> Self {
        self.vat_percent = vat_percent;
        self
    }

    /// Sets the finished weight.
    #[must_use]
    pub fn with_weight_out(mut self, weight_out: Decimal) -> Self {
        self.weight_out = Some(weight_out);
        self
    }

    /// The weight the line is valued at: finished weight when recorded,
    /// otherwise the weight received.
    #[must_use]
    pub fn valued_weight(&self) -> Decimal {
        self.weight_out.unwrap_or(self.weight_in)
    }
}

/// Valuation of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineValuation {
    /// Weight the line was valued at.
    pub weight: Decimal,
    /// `weight × rate`.
    pub metal_value: Decimal,
    /// Flat charge, or charge per gram × weight.
    pub making_charges: Decimal,
    /// `metal_value + making_charges`.
    pub subtotal: Decimal,
    /// `subtotal × vat_percent / 100`.
    pub vat_amount: Decimal,
    /// `subtotal + vat_amount`.
    pub line_total: Decimal,
}

/// Valuation of a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentValuation {
    /// Per-line results in input order.
    pub lines: Vec<LineValuation>,
    /// Sum of line subtotals.
    pub subtotal: Decimal,
    /// Document-level discount, deducted after VAT is computed per line.
    pub discount_amount: Decimal,
    /// Sum of line VAT amounts.
    pub vat_total: Decimal,
    /// Signed manual adjustment, applied last.
    pub round_off_amount: Decimal,
    /// `subtotal − discount_amount + vat_total + round_off_amount`.
    pub grand_total: Decimal,
    /// Sum of valued line weights.
    pub net_weight: Decimal,
    /// Sum of line quantities.
    pub total_quantity: i64,
}
