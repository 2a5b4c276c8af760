//! Settlement transaction
//!
//! A [`Transaction`] is the unit of atomicity. It owns the row locks it has
//! taken, snapshots every row on first lock and writes the snapshot back
//! when dropped uncommitted. New rows and publications are staged and only
//! become visible on [`Transaction::commit`].
//!
//! Lock discipline:
//! - one owner's accounts are locked in canonical currency order;
//! - accounts of another owner and explicitly named orders are locked with a
//!   bounded wait, expiry surfaces as [`StoreError::Busy`];
//! - resting-order candidates are only ever try-locked.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::RawMutex;
use rust_decimal::Decimal;
use tracing::debug;
use types::account::{Account, Deposit, Withdrawal};
use types::currency::{Currency, Pair};
use types::errors::{ExchangeError, ValidationError};
use types::ids::{OrderId, UserId};
use types::order::{Order, OrderStatus, Side};

use crate::events::{ExchangeEvent, Outbox};
use crate::external::PublicationSink;
use crate::store::{Store, StoreError};

type RowGuard<T> = ArcMutexGuard<RawMutex, T>;

/// A locked row and its value at lock time
struct Held<T: Clone + PartialEq> {
    guard: RowGuard<T>,
    original: T,
}

impl<T: Clone + PartialEq> Held<T> {
    fn new(guard: RowGuard<T>) -> Self {
        let original = (*guard).clone();
        Self { guard, original }
    }

    fn current(&self) -> &T {
        &self.guard
    }

    fn changed(&self) -> bool {
        *self.guard != self.original
    }

    fn restore(&mut self) {
        *self.guard = self.original.clone();
    }
}

/// Result of a non-blocking order lock attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TryLock {
    Acquired(Order),
    /// Another transaction holds the row
    Busy,
    /// No such order row
    Missing,
}

pub struct Transaction<'s> {
    store: &'s Store,
    lock_wait: Duration,
    timestamp: i64,
    accounts: BTreeMap<(UserId, Currency), Held<Account>>,
    orders: HashMap<OrderId, Held<Order>>,
    /// Orders created by this transaction, in creation order
    inserted: Vec<Order>,
    deposits: Vec<Deposit>,
    withdrawals: Vec<Withdrawal>,
    outbox: Outbox,
    committed: bool,
}

impl<'s> Transaction<'s> {
    pub fn begin(store: &'s Store, lock_wait: Duration) -> Self {
        Self {
            store,
            lock_wait,
            timestamp: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            accounts: BTreeMap::new(),
            orders: HashMap::new(),
            inserted: Vec::new(),
            deposits: Vec::new(),
            withdrawals: Vec::new(),
            outbox: Outbox::new(),
            committed: false,
        }
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    /// Wall-clock time the transaction started (Unix nanos)
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn next_sequence(&self) -> u64 {
        self.store.next_sequence()
    }

    // ── Accounts ───────────────────────────────────────────────────────

    /// Lock one owner's accounts in canonical currency order.
    ///
    /// Accounts already held are skipped. A missing account is a validation
    /// failure: accounts must be created before they are used.
    pub fn lock_accounts(&mut self, owner: UserId, currencies: &[Currency]) -> Result<(), ExchangeError> {
        let mut wanted = currencies.to_vec();
        wanted.sort();
        wanted.dedup();

        for currency in wanted {
            let key = (owner, currency);
            if self.accounts.contains_key(&key) {
                continue;
            }
            let row = self.store.account_row(owner, currency).ok_or_else(|| {
                ValidationError::Malformed(format!("you should create {currency} account first"))
            })?;
            let guard = row
                .try_lock_arc_for(self.lock_wait)
                .ok_or_else(|| StoreError::Busy(format!("account {owner}/{currency}")))?;
            debug!(%owner, %currency, "Account locked");
            self.accounts.insert(key, Held::new(guard));
        }
        Ok(())
    }

    /// Lock both accounts an order trades between
    pub fn lock_pair_accounts(&mut self, owner: UserId, pair: Pair) -> Result<(), ExchangeError> {
        self.lock_accounts(owner, &pair.currencies())
    }

    pub fn account(&self, owner: UserId, currency: Currency) -> Result<&Account, StoreError> {
        self.accounts
            .get(&(owner, currency))
            .map(|held| held.current())
            .ok_or_else(|| StoreError::NotHeld(format!("account {owner}/{currency}")))
    }

    pub fn account_mut(&mut self, owner: UserId, currency: Currency) -> Result<&mut Account, StoreError> {
        self.accounts
            .get_mut(&(owner, currency))
            .map(|held| &mut *held.guard)
            .ok_or_else(|| StoreError::NotHeld(format!("account {owner}/{currency}")))
    }

    // ── Orders ─────────────────────────────────────────────────────────

    /// Lock a named order, waiting up to the lock wait.
    ///
    /// `Ok(None)` when the order does not exist.
    pub fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, ExchangeError> {
        if let Ok(order) = self.order(&order_id) {
            return Ok(Some(order.clone()));
        }
        let Some(row) = self.store.order_row(&order_id) else {
            return Ok(None);
        };
        let guard = row
            .try_lock_arc_for(self.lock_wait)
            .ok_or_else(|| StoreError::Busy(format!("order {order_id}")))?;
        let held = Held::new(guard);
        let order = held.current().clone();
        self.orders.insert(order_id, held);
        Ok(Some(order))
    }

    /// Lock an order owned by `owner`; someone else's order counts as missing
    pub fn lock_owned_order(&mut self, owner: UserId, order_id: OrderId) -> Result<Option<Order>, ExchangeError> {
        match self.lock_order(order_id)? {
            Some(order) if order.owner == owner => Ok(Some(order)),
            Some(_) => {
                self.release_order(&order_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Try to lock an order without waiting
    pub fn try_lock_order(&mut self, order_id: OrderId) -> TryLock {
        if let Ok(order) = self.order(&order_id) {
            return TryLock::Acquired(order.clone());
        }
        let Some(row) = self.store.order_row(&order_id) else {
            return TryLock::Missing;
        };
        match row.try_lock_arc() {
            Some(guard) => {
                let held = Held::new(guard);
                let order = held.current().clone();
                self.orders.insert(order_id, held);
                TryLock::Acquired(order)
            }
            None => TryLock::Busy,
        }
    }

    /// Give back an order row this transaction has not modified
    pub fn release_order(&mut self, order_id: &OrderId) {
        if self.orders.get(order_id).is_some_and(|held| !held.changed()) {
            self.orders.remove(order_id);
        }
    }

    pub fn order(&self, order_id: &OrderId) -> Result<&Order, StoreError> {
        if let Some(held) = self.orders.get(order_id) {
            return Ok(held.current());
        }
        self.inserted
            .iter()
            .find(|order| &order.order_id == order_id)
            .ok_or_else(|| StoreError::NotHeld(format!("order {order_id}")))
    }

    /// Write back a locked or newly inserted order
    pub fn put_order(&mut self, order: Order) -> Result<(), StoreError> {
        if let Some(held) = self.orders.get_mut(&order.order_id) {
            *held.guard = order;
            return Ok(());
        }
        match self.inserted.iter_mut().find(|o| o.order_id == order.order_id) {
            Some(slot) => {
                *slot = order;
                Ok(())
            }
            None => Err(StoreError::NotHeld(format!("order {}", order.order_id))),
        }
    }

    /// Stage a new order row
    pub fn insert_order(&mut self, order: Order) -> OrderId {
        let order_id = order.order_id;
        self.inserted.push(order);
        order_id
    }

    // ── Other staged rows ──────────────────────────────────────────────

    pub fn record_deposit(&mut self, deposit: Deposit) {
        self.deposits.push(deposit);
    }

    pub fn record_withdrawal(&mut self, withdrawal: Withdrawal) {
        self.withdrawals.push(withdrawal);
    }

    /// Stage an event; delivered only if the transaction commits
    pub fn publish(&mut self, event: ExchangeEvent) {
        self.outbox.push(event);
    }

    // ── Commit ─────────────────────────────────────────────────────────

    /// Make every change visible, release the row locks, then publish.
    ///
    /// New rows and index updates are applied while the touched rows are
    /// still locked, so a concurrent matcher never finds an index entry that
    /// disagrees with a row it can lock.
    pub fn commit(mut self, sink: &dyn PublicationSink) {
        self.committed = true;

        let orders: Vec<Held<Order>> = self.orders.drain().map(|(_, held)| held).collect();
        let accounts: Vec<Held<Account>> = std::mem::take(&mut self.accounts).into_values().collect();

        let mut changed: Vec<Order> = orders
            .iter()
            .filter(|held| held.changed())
            .map(|held| held.current().clone())
            .collect();
        changed.sort_by_key(|order| order.sequence);

        for order in std::mem::take(&mut self.inserted) {
            self.store.insert_order(order.clone());
            changed.push(order);
        }

        let mut levels: Vec<(Pair, Side, Decimal)> = Vec::new();
        for order in &changed {
            for price in self.store.sync_book(order) {
                let level = (order.pair, order.side, price);
                if !levels.contains(&level) {
                    levels.push(level);
                }
            }
        }

        for deposit in self.deposits.drain(..) {
            self.store.record_deposit(deposit);
        }
        for withdrawal in self.withdrawals.drain(..) {
            self.store.record_withdrawal(withdrawal);
        }

        let mut events = Vec::new();
        for order in changed {
            if order.status == OrderStatus::Completed {
                events.push(ExchangeEvent::HistoryAppended(order.clone()));
            }
            events.push(ExchangeEvent::OrderChanged(order));
        }
        for (pair, side, price) in levels {
            let amount = self.store.book(pair, side).lock().level_amount(price);
            events.push(ExchangeEvent::OfferChanged {
                pair,
                side,
                price,
                amount,
            });
        }
        for held in accounts.iter().filter(|held| held.changed()) {
            let account = held.current();
            events.push(ExchangeEvent::BalanceChanged {
                owner: account.owner,
                currency: account.currency,
                balance: account.balance,
            });
        }
        events.extend(self.outbox.drain());

        drop(orders);
        drop(accounts);

        debug!(events = events.len(), "Transaction committed");
        for event in &events {
            sink.publish(&event.topic(), event);
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut restored = 0usize;
        for held in self.orders.values_mut().filter(|held| held.changed()) {
            held.restore();
            restored += 1;
        }
        for held in self.accounts.values_mut().filter(|held| held.changed()) {
            held.restore();
            restored += 1;
        }
        if restored > 0 || !self.inserted.is_empty() || !self.outbox.is_empty() {
            debug!(
                restored,
                discarded_orders = self.inserted.len(),
                discarded_events = self.outbox.len(),
                "Transaction rolled back"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemorySink;
    use types::order::OrderTerms;

    fn store_with_account(balance: i64) -> (Store, UserId) {
        let store = Store::new();
        let owner = UserId::new();
        let mut account = Account::new(owner, Currency::BTC, "addr", 1);
        account.credit(Decimal::from(balance)).unwrap();
        store.insert_account(account).unwrap();
        store.insert_account(Account::new(owner, Currency::ETH, "addr", 1)).unwrap();
        (store, owner)
    }

    fn wait() -> Duration {
        Duration::from_millis(20)
    }

    #[test]
    fn test_drop_restores_locked_rows() {
        let (store, owner) = store_with_account(10);
        {
            let mut tx = Transaction::begin(&store, wait());
            tx.lock_accounts(owner, &[Currency::BTC]).unwrap();
            tx.account_mut(owner, Currency::BTC).unwrap().debit(Decimal::from(4)).unwrap();
        }
        assert_eq!(store.account(owner, Currency::BTC).unwrap().balance, Decimal::from(10));
    }

    #[test]
    fn test_commit_applies_and_publishes() {
        let (store, owner) = store_with_account(10);
        let sink = MemorySink::new();
        let mut tx = Transaction::begin(&store, wait());
        tx.lock_accounts(owner, &[Currency::BTC]).unwrap();
        tx.account_mut(owner, Currency::BTC).unwrap().debit(Decimal::from(4)).unwrap();
        tx.commit(&sink);

        assert_eq!(store.account(owner, Currency::BTC).unwrap().balance, Decimal::from(6));
        assert_eq!(sink.on_topic(&format!("accounts_{owner}")).len(), 1);
    }

    #[test]
    fn test_rolled_back_rows_and_events_never_appear() {
        let (store, owner) = store_with_account(10);
        let sink = MemorySink::new();
        let terms = OrderTerms::resolve(Decimal::ONE, Some(Decimal::ONE), None).unwrap();
        let order = Order::new(owner, Pair::btc_eth(), Side::BUY, terms, false, 1, 1);
        let order_id = order.order_id;
        {
            let mut tx = Transaction::begin(&store, wait());
            tx.insert_order(order);
            tx.publish(ExchangeEvent::BalanceChanged {
                owner,
                currency: Currency::BTC,
                balance: Decimal::ZERO,
            });
        }
        assert!(store.order(&order_id).is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_busy_account_times_out() {
        let (store, owner) = store_with_account(10);
        let mut first = Transaction::begin(&store, wait());
        first.lock_accounts(owner, &[Currency::BTC]).unwrap();

        let mut second = Transaction::begin(&store, wait());
        let err = second.lock_accounts(owner, &[Currency::BTC]).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_relocking_held_account_is_noop() {
        let (store, owner) = store_with_account(10);
        let mut tx = Transaction::begin(&store, wait());
        tx.lock_accounts(owner, &[Currency::ETH, Currency::BTC]).unwrap();
        tx.lock_pair_accounts(owner, Pair::btc_eth()).unwrap();
        assert!(tx.account(owner, Currency::ETH).is_ok());
    }

    #[test]
    fn test_missing_account_is_validation_error() {
        let store = Store::new();
        let mut tx = Transaction::begin(&store, wait());
        let err = tx.lock_accounts(UserId::new(), &[Currency::BTC]).unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(_)));
    }

    #[test]
    fn test_try_lock_reports_busy_and_missing() {
        let (store, owner) = store_with_account(10);
        let terms = OrderTerms::resolve(Decimal::ONE, Some(Decimal::ONE), None).unwrap();
        let order = Order::new(owner, Pair::btc_eth(), Side::SELL, terms, false, 1, 1);
        store.insert_order(order.clone());

        let mut holder = Transaction::begin(&store, wait());
        assert!(matches!(holder.try_lock_order(order.order_id), TryLock::Acquired(_)));

        let mut other = Transaction::begin(&store, wait());
        assert_eq!(other.try_lock_order(order.order_id), TryLock::Busy);
        assert_eq!(other.try_lock_order(OrderId::new()), TryLock::Missing);

        holder.release_order(&order.order_id);
        assert!(matches!(other.try_lock_order(order.order_id), TryLock::Acquired(_)));
    }

    #[test]
    fn test_lock_owned_order_hides_foreign_orders() {
        let (store, owner) = store_with_account(10);
        let terms = OrderTerms::resolve(Decimal::ONE, Some(Decimal::ONE), None).unwrap();
        let order = Order::new(owner, Pair::btc_eth(), Side::SELL, terms, false, 1, 1);
        store.insert_order(order.clone());

        let mut tx = Transaction::begin(&store, wait());
        assert!(tx.lock_owned_order(UserId::new(), order.order_id).unwrap().is_none());
        assert!(tx.lock_owned_order(owner, order.order_id).unwrap().is_some());
    }
}
