//! Cursor over the opposite side of the book
//!
//! Walks a [`RestingIndex`] in priority order without holding its mutex
//! between steps. Orders that join behind the cursor are not revisited;
//! orders that join ahead of it are picked up.

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use types::ids::OrderId;

use super::{PriorityKey, RestingIndex};

/// A resting order worth trying to lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub order_id: OrderId,
    /// Price as indexed; re-checked against the locked row
    pub price: Decimal,
}

pub struct OppositeCursor {
    index: Arc<Mutex<RestingIndex>>,
    position: Option<PriorityKey>,
}

impl OppositeCursor {
    pub fn new(index: Arc<Mutex<RestingIndex>>) -> Self {
        Self {
            index,
            position: None,
        }
    }

    /// Next candidate in priority order, or None once the side is exhausted
    pub fn next_candidate(&mut self) -> Option<Candidate> {
        let (key, price) = self.index.lock().next_after(self.position.as_ref())?;
        self.position = Some(key);
        Some(Candidate {
            order_id: key.order_id(),
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::currency::Pair;
    use types::ids::UserId;
    use types::order::{Order, OrderStatus, OrderTerms, Side};

    fn pending(price: i64, sequence: u64) -> Order {
        let terms = OrderTerms::resolve(Decimal::from(price), Some(Decimal::ONE), None).unwrap();
        let mut order = Order::new(UserId::new(), Pair::btc_eth(), Side::SELL, terms, false, sequence, 1708123456789000000);
        order.status = OrderStatus::Pending;
        order
    }

    #[test]
    fn test_cursor_walks_in_priority_order() {
        let index = Arc::new(Mutex::new(RestingIndex::new(Side::SELL)));
        let a = pending(2, 1);
        let b = pending(1, 2);
        index.lock().sync(&a);
        index.lock().sync(&b);

        let mut cursor = OppositeCursor::new(index);
        assert_eq!(cursor.next_candidate().unwrap().order_id, b.order_id);
        assert_eq!(cursor.next_candidate().unwrap().price, Decimal::from(2));
        assert!(cursor.next_candidate().is_none());
    }

    #[test]
    fn test_cursor_skips_removed_and_sees_later_entries() {
        let index = Arc::new(Mutex::new(RestingIndex::new(Side::SELL)));
        let a = pending(1, 1);
        let b = pending(2, 2);
        index.lock().sync(&a);
        index.lock().sync(&b);

        let mut cursor = OppositeCursor::new(index.clone());
        assert_eq!(cursor.next_candidate().unwrap().order_id, a.order_id);

        index.lock().remove(&b.order_id);
        let c = pending(3, 3);
        index.lock().sync(&c);
        assert_eq!(cursor.next_candidate().unwrap().order_id, c.order_id);
    }
}
