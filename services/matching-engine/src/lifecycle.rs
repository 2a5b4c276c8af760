//! Order lifecycle
//!
//! The status transition table and the owner-initiated transitions
//! (cancel, lock, unlock, update). An order that does not exist or belongs
//! to someone else is treated as already gone: the call succeeds and does
//! nothing.

use tracing::info;
use types::errors::{ExchangeError, ValidationError};
use types::ids::{OrderId, UserId};
use types::order::{Order, OrderStatus, OrderTerms};

use crate::approval;
use crate::config::EngineConfig;
use crate::engine;
use crate::ledger;
use crate::requests::UpdateRequest;
use crate::transaction::Transaction;

/// Legal status transitions. Staying in a live status is always allowed.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    if from == to {
        return !from.is_terminal();
    }
    matches!(
        (from, to),
        (Init, Pending | Completed | Approving | Locked | Canceled)
            | (Pending, Init | Completed | Approving | Locked | Canceled)
            | (Approving, Approved | Pending | Init | Completed | Canceled)
            | (Approved, Pending | Init | Completed | Canceled)
            | (Locked, Init | Canceled)
    )
}

/// Move an order to `to`, or fail with `IllegalStatus` naming `action`
pub fn transition(order: &mut Order, to: OrderStatus, action: &'static str) -> Result<(), ValidationError> {
    if !can_transition(order.status, to) {
        return Err(ValidationError::IllegalStatus {
            order_id: order.order_id,
            status: order.status,
            action,
        });
    }
    order.status = to;
    Ok(())
}

/// Cancel an order and unfreeze its reserve.
///
/// A counterparty waiting in the approval handshake goes back to PENDING.
pub fn cancel(tx: &mut Transaction<'_>, owner: UserId, order_id: OrderId) -> Result<Option<Order>, ExchangeError> {
    let Some(mut order) = tx.lock_owned_order(owner, order_id)? else {
        return Ok(None);
    };
    if !order.status.holds_reserve() {
        return Err(ValidationError::IllegalStatus {
            order_id,
            status: order.status,
            action: "canceled",
        }
        .into());
    }

    tx.lock_pair_accounts(owner, order.pair)?;
    if order.status.in_approval() {
        approval::release_counterparty(tx, &order)?;
    }
    ledger::unfreeze(tx, &order)?;

    transition(&mut order, OrderStatus::Canceled, "canceled")?;
    order.link = None;
    order.updated_at = tx.timestamp();
    tx.put_order(order.clone())?;
    info!(%order_id, %owner, "Order canceled");
    Ok(Some(order))
}

/// Take an INIT/PENDING order out of the book
pub fn lock(tx: &mut Transaction<'_>, owner: UserId, order_id: OrderId) -> Result<Option<Order>, ExchangeError> {
    let Some(mut order) = tx.lock_owned_order(owner, order_id)? else {
        return Ok(None);
    };
    if !matches!(order.status, OrderStatus::Init | OrderStatus::Pending) {
        return Err(ExchangeError::LockFailure {
            order_id,
            status: order.status,
        });
    }

    transition(&mut order, OrderStatus::Locked, "locked")?;
    order.updated_at = tx.timestamp();
    tx.put_order(order.clone())?;
    info!(%order_id, %owner, "Order locked");
    Ok(Some(order))
}

/// Return a LOCKED order to INIT and match it again
pub fn unlock(
    tx: &mut Transaction<'_>,
    config: &EngineConfig,
    owner: UserId,
    order_id: OrderId,
) -> Result<Vec<Order>, ExchangeError> {
    let Some(mut order) = tx.lock_owned_order(owner, order_id)? else {
        return Ok(Vec::new());
    };
    if order.status != OrderStatus::Locked {
        return Err(ExchangeError::UnlockFailure {
            order_id,
            status: order.status,
        });
    }

    transition(&mut order, OrderStatus::Init, "unlocked")?;
    order.updated_at = tx.timestamp();
    tx.put_order(order)?;
    info!(%order_id, %owner, "Order unlocked");
    engine::process(tx, config, order_id)
}

/// Re-price or re-size an INIT/PENDING order, then match it again.
///
/// The old reserve is released and the new one frozen in the same
/// transaction; if the owner cannot cover the new reserve nothing changes.
pub fn update(
    tx: &mut Transaction<'_>,
    config: &EngineConfig,
    owner: UserId,
    order_id: OrderId,
    request: &UpdateRequest,
) -> Result<Vec<Order>, ExchangeError> {
    let Some(mut order) = tx.lock_owned_order(owner, order_id)? else {
        return Ok(Vec::new());
    };
    if !matches!(order.status, OrderStatus::Init | OrderStatus::Pending) {
        return Err(ExchangeError::UpdateFailure {
            order_id,
            status: order.status,
        });
    }

    let price = request.price.unwrap_or(order.price);
    let terms = match (request.amount, request.total) {
        (None, None) => OrderTerms::resolve(price, Some(order.amount), None)?,
        (amount, total) => OrderTerms::resolve(price, amount, total)?,
    };
    config.check_terms(&terms)?;

    tx.lock_pair_accounts(owner, order.pair)?;
    ledger::unfreeze(tx, &order)?;
    order.set_terms(terms);
    ledger::freeze(tx, &order)?;

    transition(&mut order, OrderStatus::Init, "updated")?;
    order.updated_at = tx.timestamp();
    tx.put_order(order)?;
    info!(%order_id, %owner, price = %terms.price, amount = %terms.amount, "Order updated");
    engine::process(tx, config, order_id)
}
