//! Fixed-point decimal helpers for prices, amounts and balances
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Every stored value carries at most [`DECIMAL_PLACES`] fractional digits;
//! products are rounded HALF_UP back to that precision.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Fractional digits kept for every stored amount, price and balance
pub const DECIMAL_PLACES: u32 = 8;

/// Tolerance for value comparisons: 10^-8
pub const EPS: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Largest amount, total or balance the exchange stores: 10^18.
///
/// Keeps every product and sum of stored values inside `Decimal`'s range
/// at full 8-digit precision.
pub const MAX_VALUE: Decimal = Decimal::from_parts(2_808_348_672, 232_830_643, 0, false, 0);

/// Round to storage precision, HALF_UP
pub fn round8(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncate to storage precision (never rounds up)
pub fn trunc8(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::ToZero)
}

/// True if the value can be stored without losing digits
pub fn fits_precision(value: Decimal) -> bool {
    value.normalize().scale() <= DECIMAL_PLACES
}

/// `|a - b| <= EPS`
pub fn within_eps(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= EPS
}

/// Value of `amount` units at `price`, rounded to storage precision.
///
/// Both factors must already be bounded (stored orders are); use
/// [`checked_value_of`] on caller input.
pub fn value_of(amount: Decimal, price: Decimal) -> Decimal {
    round8(amount * price)
}

/// [`value_of`], or `None` when the product leaves `Decimal`'s range
pub fn checked_value_of(amount: Decimal, price: Decimal) -> Option<Decimal> {
    amount.checked_mul(price).map(round8)
}

/// Parse a decimal from user input, rejecting exponent and garbage forms
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str_exact(raw.trim()).ok()
}
