//! Crossing detection logic
//!
//! Determines when a bid and ask can match based on price compatibility

use rust_decimal::Decimal;
use types::order::Side;

/// A bid and an ask cross when the bid pays at least the ask
pub fn can_match(bid_price: Decimal, ask_price: Decimal) -> bool {
    bid_price >= ask_price
}

/// Check if an incoming order crosses a resting order of the other side
pub fn incoming_can_match(incoming_side: Side, incoming_price: Decimal, resting_price: Decimal) -> bool {
    match incoming_side {
        Side::BUY => can_match(incoming_price, resting_price),
        Side::SELL => can_match(resting_price, incoming_price),
    }
}
