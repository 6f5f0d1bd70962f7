//! Cart totals. All arithmetic happens in integer minor units; decimal
//! amounts only appear in the serialized boundary view.

use serde::Serialize;

use crate::models::{CartItem, CatalogItem};

/// Combined VAT-style rate, in basis points (19.25%).
pub const TAX_RATE_BASIS_POINTS: i64 = 1925;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
  pub item_count: i64,
  pub subtotal_cents: i64,
  pub tax_cents: i64,
  pub total_cents: i64,
}

/// Prices a cart. Lines are (row, catalog item) pairs; rows whose item no
/// longer exists must already have been dropped by the store.
pub fn summarize(lines: &[(CartItem, CatalogItem)]) -> CartSummary {
  let mut item_count: i64 = 0;
  let mut subtotal_cents: i64 = 0;
  for (row, item) in lines {
    item_count += i64::from(row.quantity);
    subtotal_cents += item.price_cents * i64::from(row.quantity);
  }
  let tax_cents = tax_on(subtotal_cents);
  CartSummary {
    item_count,
    subtotal_cents,
    tax_cents,
    total_cents: subtotal_cents + tax_cents,
  }
}

/// Tax on a subtotal, rounded half away from zero. Subtotals are never
/// negative, so this is plain half-up rounding of `subtotal * 19.25%`.
pub fn tax_on(subtotal_cents: i64) -> i64 {
  (subtotal_cents * TAX_RATE_BASIS_POINTS + 5_000) / 10_000
}

/// Boundary view of a summary, with minor units converted to two-decimal
/// amounts the way API clients expect them.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummaryView {
  pub item_count: i64,
  pub subtotal: f64,
  pub tax: f64,
  pub total: f64,
}

impl From<CartSummary> for CartSummaryView {
  fn from(s: CartSummary) -> Self {
    CartSummaryView {
      item_count: s.item_count,
      subtotal: to_decimal(s.subtotal_cents),
      tax: to_decimal(s.tax_cents),
      total: to_decimal(s.total_cents),
    }
  }
}

pub fn to_decimal(cents: i64) -> f64 {
  cents as f64 / 100.0
}
