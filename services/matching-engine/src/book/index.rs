//! Price-time priority index for one side of one pair

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::Decimal;
use types::ids::OrderId;
use types::order::{Order, OrderStatus, Side};

use super::PriceLevel;

/// Sort key of a resting order
///
/// `rank` is the price for asks and the negated price for bids, so the best
/// order of either side sorts first. Ties go to the lower sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriorityKey {
    rank: Decimal,
    sequence: u64,
    order_id: OrderId,
}

impl PriorityKey {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: PriorityKey,
    price: Decimal,
    amount: Decimal,
}

/// Resting (PENDING) orders of one (pair, side)
#[derive(Debug, Clone)]
pub struct RestingIndex {
    side: Side,
    queue: BTreeSet<PriorityKey>,
    entries: HashMap<OrderId, Entry>,
    /// Aggregates keyed by rank, best level first
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl RestingIndex {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            queue: BTreeSet::new(),
            entries: HashMap::new(),
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    fn rank(&self, price: Decimal) -> Decimal {
        match self.side {
            Side::SELL => price,
            Side::BUY => -price,
        }
    }

    fn price_of(&self, rank: Decimal) -> Decimal {
        match self.side {
            Side::SELL => rank,
            Side::BUY => -rank,
        }
    }

    /// Bring the index in line with a committed order record.
    ///
    /// PENDING orders of this side are (re)inserted with their current price
    /// and amount; anything else is removed. Returns the prices whose level
    /// aggregate changed.
    pub fn sync(&mut self, order: &Order) -> Vec<Decimal> {
        debug_assert_eq!(order.side, self.side, "order synced into the wrong side");

        let mut touched = Vec::with_capacity(2);
        if let Some(old) = self.remove(&order.order_id) {
            touched.push(old);
        }
        if order.status == OrderStatus::Pending && order.amount > Decimal::ZERO {
            self.insert(order);
            if !touched.contains(&order.price) {
                touched.push(order.price);
            }
        }
        touched
    }

    fn insert(&mut self, order: &Order) {
        let rank = self.rank(order.price);
        let key = PriorityKey {
            rank,
            sequence: order.sequence,
            order_id: order.order_id,
        };
        self.queue.insert(key);
        self.entries.insert(
            order.order_id,
            Entry {
                key,
                price: order.price,
                amount: order.amount,
            },
        );
        self.levels.entry(rank).or_default().add(order.amount);
    }

    /// Drop an order; returns the price it rested at
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Decimal> {
        let entry = self.entries.remove(order_id)?;
        self.queue.remove(&entry.key);
        if let Some(level) = self.levels.get_mut(&entry.key.rank) {
            level.remove(entry.amount);
            if level.is_empty() {
                self.levels.remove(&entry.key.rank);
            }
        }
        Some(entry.price)
    }

    /// First key strictly after `after` (or the best key), with its price
    pub fn next_after(&self, after: Option<&PriorityKey>) -> Option<(PriorityKey, Decimal)> {
        let key = match after {
            None => self.queue.iter().next(),
            Some(after) => self
                .queue
                .range((std::ops::Bound::Excluded(*after), std::ops::Bound::Unbounded))
                .next(),
        }?;
        Some((*key, self.price_of(key.rank)))
    }

    /// Best price on this side
    pub fn best_price(&self) -> Option<Decimal> {
        self.levels.keys().next().map(|rank| self.price_of(*rank))
    }

    /// Aggregate resting amount at a price (zero when the level is empty)
    pub fn level_amount(&self, price: Decimal) -> Decimal {
        self.levels
            .get(&self.rank(price))
            .map(|level| level.total_amount())
            .unwrap_or(Decimal::ZERO)
    }

    /// Top `depth` levels, best first, as (price, amount)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Decimal, Decimal)> {
        self.levels
            .iter()
            .take(depth)
            .map(|(rank, level)| (self.price_of(*rank), level.total_amount()))
            .collect()
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.entries.contains_key(order_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
