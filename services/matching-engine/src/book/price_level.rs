//! Price level aggregate
//!
//! Resting amount and order count at one price. The per-order FIFO lives in
//! the priority queue of [`RestingIndex`](super::RestingIndex); a level only
//! answers "how much is offered at this price".

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceLevel {
    /// Sum of resting secondary amounts at this price
    total_amount: Decimal,
    order_count: usize,
}

impl PriceLevel {
    /// Account for an order joining the level
    pub fn add(&mut self, amount: Decimal) {
        self.total_amount += amount;
        self.order_count += 1;
    }

    /// Account for an order leaving the level
    pub fn remove(&mut self, amount: Decimal) {
        self.total_amount -= amount;
        self.order_count = self.order_count.saturating_sub(1);
        if self.order_count == 0 {
            self.total_amount = Decimal::ZERO;
        }
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }
}
