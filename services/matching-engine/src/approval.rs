//! Approval handshake
//!
//! When either side of a match requires approval, no value moves: both
//! orders go to APPROVING and point at each other. Each link records the
//! holder's role so the eventual merge executes at the maker's price.
//! Once every side that needs approval has approved, the pair is merged as
//! an ordinary fill and any remainder is matched again.

use tracing::info;
use types::errors::{ExchangeError, ValidationError};
use types::ids::{OrderId, UserId};
use types::order::{Link, Order, OrderStatus, Role};

use crate::config::EngineConfig;
use crate::engine;
use crate::lifecycle::transition;
use crate::matching::apply_fill;
use crate::transaction::Transaction;

/// Park a matched pair in APPROVING, linked both ways
pub(crate) fn link(tx: &mut Transaction<'_>, taker: &mut Order, maker: &mut Order) -> Result<(), ExchangeError> {
    let timestamp = tx.timestamp();
    let (taker_id, maker_id) = (taker.order_id, maker.order_id);
    for (order, other, role) in [
        (&mut *taker, maker_id, Role::Taker),
        (&mut *maker, taker_id, Role::Maker),
    ] {
        transition(order, OrderStatus::Approving, "matched")?;
        order.link = Some(Link {
            order_id: other,
            role,
        });
        order.updated_at = timestamp;
    }
    tx.put_order(taker.clone())?;
    tx.put_order(maker.clone())?;
    info!(taker = %taker.order_id, maker = %maker.order_id, "Match awaiting approval");
    Ok(())
}

/// Approve an order's side of the handshake.
///
/// Approving an order that needs no approval, or one already APPROVED,
/// returns it unchanged. Returns the records the call produced or touched.
pub fn approve(
    tx: &mut Transaction<'_>,
    config: &EngineConfig,
    owner: UserId,
    order_id: OrderId,
) -> Result<Vec<Order>, ExchangeError> {
    let Some(mut order) = tx.lock_owned_order(owner, order_id)? else {
        return Ok(Vec::new());
    };
    if !order.need_approve || order.status == OrderStatus::Approved {
        return Ok(vec![order]);
    }
    let Some(link) = order.link.filter(|_| order.status == OrderStatus::Approving) else {
        return Err(ValidationError::IllegalStatus {
            order_id,
            status: order.status,
            action: "approved",
        }
        .into());
    };

    transition(&mut order, OrderStatus::Approved, "approved")?;
    order.updated_at = tx.timestamp();
    info!(%order_id, %owner, "Order approved");

    let counterparty = tx
        .lock_order(link.order_id)?
        .filter(|other| other.status.in_approval() && other.link.map(|l| l.order_id) == Some(order_id));
    let Some(counterparty) = counterparty else {
        // The other side is gone; back to the book.
        order.link = None;
        transition(&mut order, OrderStatus::Pending, "reverted")?;
        tx.put_order(order.clone())?;
        return Ok(vec![order]);
    };

    let ready = counterparty.status == OrderStatus::Approved || !counterparty.need_approve;
    if !ready {
        tx.put_order(order.clone())?;
        return Ok(vec![order]);
    }
    merge(tx, config, order, counterparty)
}

/// Settle an approved pair and re-match whatever is left of it
fn merge(
    tx: &mut Transaction<'_>,
    config: &EngineConfig,
    approved: Order,
    counterparty: Order,
) -> Result<Vec<Order>, ExchangeError> {
    tx.lock_pair_accounts(approved.owner, approved.pair)?;
    tx.lock_pair_accounts(counterparty.owner, counterparty.pair)?;

    let (mut taker, mut maker) = match approved.link.map(|l| l.role) {
        Some(Role::Taker) => (approved, counterparty),
        _ => (counterparty, approved),
    };
    taker.link = None;
    maker.link = None;

    let fill = apply_fill(&taker, &maker, tx.next_sequence(), tx.timestamp());
    engine::settle(tx, &fill)?;
    info!(
        taker = %taker.order_id,
        maker = %maker.order_id,
        quantity = %fill.quantity,
        price = %fill.price,
        "Approved orders merged"
    );

    let mut history: Vec<Order> = fill.completed_records().into_iter().cloned().collect();
    for side in [&fill.taker, &fill.maker] {
        if side.closed() {
            continue;
        }
        let mut remainder = side.record.clone();
        transition(&mut remainder, OrderStatus::Init, "re-matched")?;
        tx.put_order(remainder)?;
        history.extend(engine::process(tx, config, side.record.order_id)?);
    }
    Ok(history)
}

/// Send the counterparty of a cancelled handshake back to the book
pub(crate) fn release_counterparty(tx: &mut Transaction<'_>, order: &Order) -> Result<(), ExchangeError> {
    let Some(link) = order.link else {
        return Ok(());
    };
    let Some(mut other) = tx.lock_order(link.order_id)? else {
        return Ok(());
    };
    if !other.status.in_approval() || other.link.map(|l| l.order_id) != Some(order.order_id) {
        tx.release_order(&link.order_id);
        return Ok(());
    }

    transition(&mut other, OrderStatus::Pending, "reverted")?;
    other.link = None;
    other.updated_at = tx.timestamp();
    tx.put_order(other)?;
    info!(order_id = %link.order_id, canceled = %order.order_id, "Approval counterparty returned to book");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemorySink;
    use crate::store::Store;
    use rust_decimal::Decimal;
    use std::time::Duration;
    use types::currency::Pair;
    use types::order::{OrderTerms, Side};

    #[test]
    fn test_dangling_link_reverts_to_book() {
        let store = Store::new();
        let owner = UserId::new();
        let terms = OrderTerms::resolve(Decimal::new(5, 1), Some(Decimal::from(20)), None).unwrap();
        let mut order = Order::new(owner, Pair::btc_eth(), Side::BUY, terms, true, 1, 1708123456789000000);
        order.status = OrderStatus::Approving;
        order.link = Some(Link {
            order_id: OrderId::new(),
            role: Role::Taker,
        });
        let order_id = order.order_id;
        store.insert_order(order);

        let mut tx = Transaction::begin(&store, Duration::from_millis(20));
        let history = approve(&mut tx, &EngineConfig::default(), owner, order_id).unwrap();
        tx.commit(&MemorySink::new());

        assert_eq!(history[0].status, OrderStatus::Pending);
        let stored = store.order(&order_id).unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(stored.link.is_none());
        assert!(store.book(Pair::btc_eth(), Side::BUY).lock().contains(&order_id));
    }
}
