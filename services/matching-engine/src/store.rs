//! Shared row store
//!
//! Accounts and orders live in concurrent tables of individually locked
//! rows. A table lookup clones the row handle out and drops the table shard
//! guard before the row itself is locked, so no table lock is ever held
//! while waiting on a row.
//!
//! Readers outside a transaction (`account`, `orders_of`, ...) lock each row
//! briefly and therefore only ever observe committed state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use types::account::{Account, Deposit, Withdrawal};
use types::currency::{Currency, Pair};
use types::errors::ExchangeError;
use types::ids::{OrderId, UserId};
use types::order::{Order, Side};

use crate::book::RestingIndex;

/// Individually lockable row
pub type Row<T> = Arc<Mutex<T>>;

/// Row-level failures inside a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} is busy")]
    Busy(String),

    #[error("{0} is not held by this transaction")]
    NotHeld(String),
}

impl From<StoreError> for ExchangeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Busy(what) => ExchangeError::Contention(what),
            StoreError::NotHeld(what) => ExchangeError::Internal(what),
        }
    }
}

/// All exchange state
pub struct Store {
    accounts: DashMap<(UserId, Currency), Row<Account>>,
    orders: DashMap<OrderId, Row<Order>>,
    books: DashMap<(Pair, Side), Arc<Mutex<RestingIndex>>>,
    deposits: Mutex<Vec<Deposit>>,
    withdrawals: Mutex<Vec<Withdrawal>>,
    sequence: AtomicU64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            orders: DashMap::new(),
            books: DashMap::new(),
            deposits: Mutex::new(Vec::new()),
            withdrawals: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(1),
        }
    }

    /// Store-wide monotonically increasing sequence (time priority)
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn account_row(&self, owner: UserId, currency: Currency) -> Option<Row<Account>> {
        self.accounts.get(&(owner, currency)).map(|row| Arc::clone(row.value()))
    }

    pub(crate) fn order_row(&self, order_id: &OrderId) -> Option<Row<Order>> {
        self.orders.get(order_id).map(|row| Arc::clone(row.value()))
    }

    /// Insert a new account; hands back the existing one if the slot is taken
    pub(crate) fn insert_account(&self, account: Account) -> Result<(), Account> {
        use dashmap::mapref::entry::Entry;

        let existing = match self.accounts.entry((account.owner, account.currency)) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(account)));
                return Ok(());
            }
        };
        let existing = existing.lock().clone();
        Err(existing)
    }

    pub(crate) fn insert_order(&self, order: Order) {
        self.orders.insert(order.order_id, Arc::new(Mutex::new(order)));
    }

    pub(crate) fn record_deposit(&self, deposit: Deposit) {
        self.deposits.lock().push(deposit);
    }

    pub(crate) fn record_withdrawal(&self, withdrawal: Withdrawal) {
        self.withdrawals.lock().push(withdrawal);
    }

    /// Resting index of one (pair, side), created on first use
    pub fn book(&self, pair: Pair, side: Side) -> Arc<Mutex<RestingIndex>> {
        let index = self
            .books
            .entry((pair, side))
            .or_insert_with(|| Arc::new(Mutex::new(RestingIndex::new(side))));
        Arc::clone(index.value())
    }

    /// Re-index a committed order; returns the level prices that changed
    pub(crate) fn sync_book(&self, order: &Order) -> Vec<Decimal> {
        self.book(order.pair, order.side).lock().sync(order)
    }

    // ── Committed-state readers ────────────────────────────────────────

    pub fn account(&self, owner: UserId, currency: Currency) -> Option<Account> {
        self.account_row(owner, currency).map(|row| row.lock().clone())
    }

    pub fn accounts_of(&self, owner: UserId) -> Vec<Account> {
        Currency::ALL
            .iter()
            .filter_map(|currency| self.account(owner, *currency))
            .collect()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.order_row(order_id).map(|row| row.lock().clone())
    }

    /// Every order record of one owner, oldest first
    pub fn orders_of(&self, owner: UserId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .order_rows()
            .into_iter()
            .map(|row| row.lock().clone())
            .filter(|order| order.owner == owner)
            .collect();
        orders.sort_by_key(|order| order.sequence);
        orders
    }

    pub fn all_accounts(&self) -> Vec<Account> {
        let rows: Vec<Row<Account>> = self.accounts.iter().map(|row| Arc::clone(row.value())).collect();
        rows.into_iter().map(|row| row.lock().clone()).collect()
    }

    pub fn all_orders(&self) -> Vec<Order> {
        self.order_rows().into_iter().map(|row| row.lock().clone()).collect()
    }

    pub fn deposits(&self) -> Vec<Deposit> {
        self.deposits.lock().clone()
    }

    pub fn withdrawals(&self) -> Vec<Withdrawal> {
        self.withdrawals.lock().clone()
    }

    // Collect handles first; locking rows while iterating would hold shard guards.
    fn order_rows(&self) -> Vec<Row<Order>> {
        self.orders.iter().map(|row| Arc::clone(row.value())).collect()
    }
}
