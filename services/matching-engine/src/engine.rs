//! Matching loop
//!
//! [`process`] matches one INIT order against the opposite side of its book
//! inside the caller's transaction. Every fill is applied to the held rows
//! immediately; nothing is visible to other transactions until commit.

use tracing::{debug, info};
use types::errors::ExchangeError;
use types::ids::OrderId;
use types::order::{Order, OrderStatus};

use crate::approval;
use crate::book::OppositeCursor;
use crate::config::EngineConfig;
use crate::ledger;
use crate::lifecycle;
use crate::matching::{apply_fill, incoming_can_match, Fill};
use crate::transaction::{Transaction, TryLock};

/// Match an order until it completes, parks in the book or waits for
/// approval.
///
/// Returns the completed fragments split off the order followed by the
/// order's final state.
pub fn process(
    tx: &mut Transaction<'_>,
    config: &EngineConfig,
    order_id: OrderId,
) -> Result<Vec<Order>, ExchangeError> {
    let mut order = tx.order(&order_id)?.clone();
    tx.lock_pair_accounts(order.owner, order.pair)?;

    let mut history = Vec::new();
    let mut cursor = OppositeCursor::new(tx.store().book(order.pair, order.side.opposite()));

    while order.total > config.min_order_total {
        let Some(mut opposite) = find_opposite(tx, &order, &mut cursor) else {
            break;
        };

        if order.need_approve || opposite.need_approve {
            approval::link(tx, &mut order, &mut opposite)?;
            history.push(order);
            return Ok(history);
        }

        tx.lock_pair_accounts(opposite.owner, opposite.pair)?;
        let fill = apply_fill(&order, &opposite, tx.next_sequence(), tx.timestamp());
        settle(tx, &fill)?;
        info!(
            taker = %order.order_id,
            maker = %opposite.order_id,
            quantity = %fill.quantity,
            price = %fill.price,
            "Orders matched"
        );

        history.extend(fill.taker.fragment.clone());
        order = fill.taker.record;
        if order.status == OrderStatus::Completed {
            history.push(order);
            return Ok(history);
        }
    }

    lifecycle::transition(&mut order, OrderStatus::Pending, "matched")?;
    order.updated_at = tx.timestamp();
    tx.put_order(order.clone())?;
    history.push(order);
    Ok(history)
}

/// Best resting order that crosses `order` and can be locked right now.
///
/// Busy rows are skipped; rows that are no longer PENDING (the index lags
/// behind a concurrent commit) are released and skipped. The scan ends at
/// the first price that does not cross.
fn find_opposite(tx: &mut Transaction<'_>, order: &Order, cursor: &mut OppositeCursor) -> Option<Order> {
    while let Some(candidate) = cursor.next_candidate() {
        if !incoming_can_match(order.side, order.price, candidate.price) {
            return None;
        }
        match tx.try_lock_order(candidate.order_id) {
            TryLock::Acquired(opposite) => {
                let eligible = opposite.status == OrderStatus::Pending
                    && opposite.pair == order.pair
                    && opposite.side == order.side.opposite()
                    && incoming_can_match(order.side, order.price, opposite.price);
                if eligible {
                    return Some(opposite);
                }
                debug!(order_id = %candidate.order_id, status = %opposite.status, "Stale book entry skipped");
                tx.release_order(&candidate.order_id);
            }
            TryLock::Busy => {
                debug!(order_id = %candidate.order_id, "Resting order busy, skipped");
            }
            TryLock::Missing => {}
        }
    }
    None
}

/// Apply a fill to the held rows: credits, refunds, new records.
///
/// Both owners' pair accounts must already be held.
pub(crate) fn settle(tx: &mut Transaction<'_>, fill: &Fill) -> Result<(), ExchangeError> {
    let buyer = &fill.buyer().record;
    let seller = &fill.seller().record;

    ledger::credit(tx, buyer.owner, buyer.to_currency(), fill.quantity)?;
    ledger::credit(tx, seller.owner, seller.to_currency(), fill.seller_proceeds)?;
    ledger::credit(tx, buyer.owner, buyer.from_currency(), fill.buyer_refund)?;
    ledger::credit(tx, seller.owner, seller.from_currency(), fill.seller_refund)?;

    for side in [&fill.taker, &fill.maker] {
        tx.put_order(side.record.clone())?;
        if let Some(fragment) = &side.fragment {
            tx.insert_order(fragment.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{GeneratedAddresses, MemorySink};
    use crate::store::Store;
    use rust_decimal::Decimal;
    use std::time::Duration;
    use types::currency::{Currency, Pair};
    use types::ids::UserId;
    use types::order::{OrderTerms, Side};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    struct Harness {
        store: Store,
        config: EngineConfig,
        sink: MemorySink,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Store::new(),
                config: EngineConfig::default(),
                sink: MemorySink::new(),
            }
        }

        fn user(&self, btc: &str, eth: &str) -> UserId {
            let owner = UserId::new();
            let mut tx = Transaction::begin(&self.store, Duration::from_millis(20));
            for (currency, amount) in [(Currency::BTC, btc), (Currency::ETH, eth)] {
                ledger::create_account(&self.store, &GeneratedAddresses, owner, currency, 1).unwrap();
                if d(amount) > Decimal::ZERO {
                    ledger::deposit(&mut tx, &self.config, owner, currency, d(amount)).unwrap();
                }
            }
            tx.commit(&self.sink);
            owner
        }

        fn place(&self, owner: UserId, side: Side, price: &str, amount: &str) -> Vec<Order> {
            let mut tx = Transaction::begin(&self.store, Duration::from_millis(20));
            let terms = OrderTerms::resolve(d(price), Some(d(amount)), None).unwrap();
            let order = Order::new(owner, Pair::btc_eth(), side, terms, false, tx.next_sequence(), tx.timestamp());
            tx.lock_pair_accounts(owner, order.pair).unwrap();
            ledger::freeze(&mut tx, &order).unwrap();
            let order_id = tx.insert_order(order);
            let history = process(&mut tx, &self.config, order_id).unwrap();
            tx.commit(&self.sink);
            history
        }

        fn balance(&self, owner: UserId, currency: Currency) -> Decimal {
            self.store.account(owner, currency).unwrap().balance
        }
    }

    #[test]
    fn test_no_opposite_rests_pending() {
        let h = Harness::new();
        let x = h.user("10", "0");
        let history = h.place(x, Side::BUY, "0.5", "20");

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatus::Pending);
        assert_eq!(h.balance(x, Currency::BTC), Decimal::ZERO);
        assert!(h.store.book(Pair::btc_eth(), Side::BUY).lock().contains(&history[0].order_id));
    }

    #[test]
    fn test_full_match_completes_both() {
        let h = Harness::new();
        let x = h.user("10", "0");
        let y = h.user("0", "20");
        let buy = h.place(x, Side::BUY, "0.5", "20");
        let sell = h.place(y, Side::SELL, "0.5", "20");

        assert_eq!(sell.last().unwrap().status, OrderStatus::Completed);
        assert_eq!(h.store.order(&buy[0].order_id).unwrap().status, OrderStatus::Completed);
        assert_eq!(h.balance(x, Currency::ETH), d("20"));
        assert_eq!(h.balance(y, Currency::BTC), d("10"));
        assert_eq!(h.balance(y, Currency::ETH), Decimal::ZERO);
        assert!(h.store.book(Pair::btc_eth(), Side::BUY).lock().is_empty());
    }

    #[test]
    fn test_non_crossing_prices_do_not_match() {
        let h = Harness::new();
        let x = h.user("10", "0");
        let y = h.user("0", "20");
        h.place(x, Side::BUY, "0.4", "10");
        let sell = h.place(y, Side::SELL, "0.5", "10");
        assert_eq!(sell[0].status, OrderStatus::Pending);
        assert_eq!(h.balance(x, Currency::ETH), Decimal::ZERO);
    }

    #[test]
    fn test_maker_price_and_buyer_refund() {
        let h = Harness::new();
        let x = h.user("10", "0");
        let y = h.user("0", "10");
        h.place(y, Side::SELL, "0.4", "10");
        let buy = h.place(x, Side::BUY, "0.5", "10");

        assert_eq!(buy.last().unwrap().status, OrderStatus::Completed);
        assert_eq!(h.balance(y, Currency::BTC), d("4"));
        assert_eq!(h.balance(x, Currency::BTC), d("6"));
        assert_eq!(h.balance(x, Currency::ETH), d("10"));
    }

    #[test]
    fn test_busy_resting_order_is_skipped() {
        let h = Harness::new();
        let x = h.user("10", "0");
        let y = h.user("0", "20");
        let first = h.place(y, Side::SELL, "0.5", "10");
        let second = h.place(y, Side::SELL, "0.5", "10");

        let mut blocker = Transaction::begin(&h.store, Duration::from_millis(20));
        assert!(matches!(blocker.try_lock_order(first[0].order_id), TryLock::Acquired(_)));

        h.place(x, Side::BUY, "0.5", "10");
        drop(blocker);

        assert_eq!(h.store.order(&first[0].order_id).unwrap().status, OrderStatus::Pending);
        assert_eq!(h.store.order(&second[0].order_id).unwrap().status, OrderStatus::Completed);
    }

    #[test]
    fn test_history_topic_receives_completed_records() {
        let h = Harness::new();
        let x = h.user("10", "0");
        let y = h.user("0", "20");
        h.place(x, Side::BUY, "0.5", "10");
        h.place(x, Side::BUY, "0.5", "10");
        h.sink.clear();
        h.place(y, Side::SELL, "0.5", "20");

        assert_eq!(h.sink.on_topic("history_btc_eth_buy").len(), 2);
        assert_eq!(h.sink.on_topic("history_btc_eth_sell").len(), 2);
    }
}
