//! Fill computation
//!
//! [`apply_fill`] matches a taker against a maker and returns the new
//! records and the balance moves, without touching any shared state.
//!
//! Value bookkeeping: the buyer froze `total` primary, the seller froze
//! `amount` secondary. A fill releases part (or all) of both reserves. The
//! buyer's released primary is split between the seller's proceeds and a
//! refund to the buyer; the seller's released secondary is split between the
//! buyer's purchase and a dust refund to the seller. Nothing is created or
//! lost.

use rust_decimal::Decimal;
use types::numeric::{value_of, EPS};
use types::order::{Order, OrderStatus, Side};

/// One side of a fill
#[derive(Debug, Clone, PartialEq)]
pub struct SettledSide {
    /// The original record after the fill; COMPLETED when closed
    pub record: Order,
    /// Completed split-off record, present when the order stays open
    pub fragment: Option<Order>,
    /// Frozen from-currency value released by this fill
    pub released: Decimal,
}

impl SettledSide {
    pub fn closed(&self) -> bool {
        self.record.status == OrderStatus::Completed
    }

    /// The completed history record this fill produced for the side
    pub fn completed(&self) -> Option<&Order> {
        match &self.fragment {
            Some(fragment) => Some(fragment),
            None if self.closed() => Some(&self.record),
            None => None,
        }
    }
}

/// Outcome of matching two orders
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Matched secondary quantity
    pub quantity: Decimal,
    /// Execution price (the maker's)
    pub price: Decimal,
    pub taker: SettledSide,
    pub maker: SettledSide,
    /// Primary credited to the seller
    pub seller_proceeds: Decimal,
    /// Primary returned to the buyer (price improvement, rounding, dust)
    pub buyer_refund: Decimal,
    /// Secondary returned to the seller (dust)
    pub seller_refund: Decimal,
}

impl Fill {
    pub fn buyer(&self) -> &SettledSide {
        if self.taker.record.side == Side::BUY {
            &self.taker
        } else {
            &self.maker
        }
    }

    pub fn seller(&self) -> &SettledSide {
        if self.taker.record.side == Side::SELL {
            &self.taker
        } else {
            &self.maker
        }
    }

    /// Completed records produced by this fill, taker first
    pub fn completed_records(&self) -> Vec<&Order> {
        self.taker
            .completed()
            .into_iter()
            .chain(self.maker.completed())
            .collect()
    }
}

/// Match `taker` against the resting `maker`.
///
/// Both orders must be on opposite sides of the same pair. `sequence` and
/// `timestamp` stamp the fragment split off the larger side.
pub fn apply_fill(taker: &Order, maker: &Order, sequence: u64, timestamp: i64) -> Fill {
    debug_assert_eq!(taker.pair, maker.pair, "fill across pairs");
    debug_assert_eq!(taker.side, maker.side.opposite(), "fill on the same side");

    let price = maker.price;
    let quantity = taker.amount.min(maker.amount);

    let taker_side = settle_side(taker, quantity, sequence, timestamp);
    let maker_side = settle_side(maker, quantity, sequence, timestamp);

    let (buyer, seller) = match taker.side {
        Side::BUY => (&taker_side, &maker_side),
        Side::SELL => (&maker_side, &taker_side),
    };
    let seller_proceeds = value_of(quantity, price).min(buyer.released);
    let buyer_refund = buyer.released - seller_proceeds;
    let seller_refund = seller.released - quantity;

    Fill {
        quantity,
        price,
        seller_proceeds,
        buyer_refund,
        seller_refund,
        taker: taker_side,
        maker: maker_side,
    }
}

/// Take `quantity` off one order.
///
/// A remainder worth no more than EPS closes the order: the leftover dust
/// is released with the rest of the reserve and refunded by the caller.
fn settle_side(order: &Order, quantity: Decimal, sequence: u64, timestamp: i64) -> SettledSide {
    let leftover = order.amount - quantity;

    if leftover * order.price <= EPS {
        let mut record = order.clone();
        record.amount = quantity;
        record.total = value_of(quantity, order.price);
        record.status = OrderStatus::Completed;
        record.link = None;
        record.updated_at = timestamp;
        return SettledSide {
            released: order.reserve(),
            record,
            fragment: None,
        };
    }

    let remaining_total = value_of(leftover, order.price);
    let fragment = order.fragment(quantity, order.total - remaining_total, sequence, timestamp);

    let mut record = order.clone();
    record.amount = leftover;
    record.total = remaining_total;
    record.updated_at = timestamp;

    let released = match order.side {
        Side::BUY => order.total - remaining_total,
        Side::SELL => quantity,
    };
    SettledSide {
        record,
        fragment: Some(fragment),
        released,
    }
}
