use rust_decimal::Decimal;

use crate::domain::product::{Discount, DiscountKind};

/// Derives the sale price from a base price and an optional discount rule.
///
/// Full precision is kept here; rounding belongs to the presentation boundary
/// (`display_price`) so repeated derivations stay stable.
pub fn effective_price(base: Decimal, discount: Option<&Discount>) -> Decimal {
    let Some(discount) = discount else {
        return base;
    };

    match discount.kind {
        DiscountKind::Percentage => {
            base * (Decimal::ONE - discount.value / Decimal::ONE_HUNDRED)
        }
        // A fixed discount larger than the base floors at zero rather than
        // going negative.
        DiscountKind::Fixed => (base - discount.value).max(Decimal::ZERO),
    }
}

/// Presentation-boundary rounding to cents, banker's rounding per
/// `rust_decimal` default.
pub fn display_price(price: Decimal) -> Decimal {
    price.round_dp(2)
}
