//! Cart money math.
//!
//! Totals are always derived from the full set of live line items. Callers
//! never patch a stored total incrementally; they hand every current line to
//! [`cart_totals`] and persist the result.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// The pricing-relevant slice of a cart line: snapshotted unit price and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub total_cart_price: Decimal,
    /// `None` when no discount took part in this computation.
    pub total_price_after_discount: Option<Decimal>,
}

/// Round a money amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a percentage discount (`20` means 20% off) and round to cents.
#[must_use]
pub fn apply_discount(total: Decimal, discount_percent: Decimal) -> Decimal {
    round_money(total * (Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED))
}

/// Sum `unit_price * quantity` over all lines, optionally discounting the sum.
#[must_use]
pub fn cart_totals(lines: &[PricedLine], discount_percent: Option<Decimal>) -> CartTotals {
    let total = lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum::<Decimal>();
    let total_cart_price = round_money(total);

    CartTotals {
        total_cart_price,
        total_price_after_discount: discount_percent
            .map(|percent| apply_discount(total_cart_price, percent)),
    }
}
