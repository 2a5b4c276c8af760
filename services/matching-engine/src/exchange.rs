//! Exchange facade
//!
//! One entry point per operation. Each mutating call runs in its own
//! [`Transaction`] under the [`RetryExecutor`]; the call returns once the
//! transaction committed (or failed for good).

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use types::account::{Account, Deposit, Withdrawal};
use types::currency::{Currency, Pair};
use types::errors::ExchangeError;
use types::ids::{OrderId, UserId};
use types::order::{Order, OrderTerms, Side};

use crate::approval;
use crate::config::EngineConfig;
use crate::engine;
use crate::executor::RetryExecutor;
use crate::external::{
    AccountProvisioner, GeneratedAddresses, LogSink, LoggingTransferClient, PublicationSink, TransferClient,
};
use crate::ledger;
use crate::lifecycle;
use crate::requests::{DepositRequest, OrderRequest, UpdateRequest, WithdrawalRequest};
use crate::store::Store;
use crate::transaction::Transaction;

/// Aggregated resting amount at one price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub price: Decimal,
    pub amount: Decimal,
}

pub struct Exchange {
    config: EngineConfig,
    store: Store,
    executor: RetryExecutor,
    sink: Arc<dyn PublicationSink>,
    transfer: Arc<dyn TransferClient>,
    provisioner: Arc<dyn AccountProvisioner>,
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange {
    /// Create an exchange with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an exchange with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            executor: RetryExecutor::new(config.retry.clone()),
            config,
            store: Store::new(),
            sink: Arc::new(LogSink),
            transfer: Arc::new(LoggingTransferClient),
            provisioner: Arc::new(GeneratedAddresses),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PublicationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_transfer_client(mut self, transfer: Arc<dyn TransferClient>) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_provisioner(mut self, provisioner: Arc<dyn AccountProvisioner>) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run `body` in a fresh transaction, retrying on contention, and
    /// commit it on success
    fn transact<T>(
        &self,
        operation: &'static str,
        mut body: impl FnMut(&mut Transaction<'_>) -> Result<T, ExchangeError>,
    ) -> Result<T, ExchangeError> {
        self.executor.run(operation, || {
            let mut tx = Transaction::begin(&self.store, self.config.lock_wait());
            let value = body(&mut tx)?;
            tx.commit(self.sink.as_ref());
            Ok(value)
        })
    }

    // ── Accounts ───────────────────────────────────────────────────────

    pub fn create_account(&self, owner: UserId, currency: Currency) -> Result<Account, ExchangeError> {
        let timestamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        ledger::create_account(&self.store, self.provisioner.as_ref(), owner, currency, timestamp)
    }

    pub fn deposit(&self, owner: UserId, request: DepositRequest) -> Result<Deposit, ExchangeError> {
        let deposit = self.transact("deposit", |tx| {
            ledger::deposit(tx, &self.config, owner, request.currency, request.amount)
        })?;
        info!(%owner, currency = %deposit.currency, amount = %deposit.amount, "Deposit confirmed");
        Ok(deposit)
    }

    pub fn withdraw(&self, owner: UserId, request: WithdrawalRequest) -> Result<Withdrawal, ExchangeError> {
        let withdrawal = self.transact("withdraw", |tx| {
            ledger::withdraw(
                tx,
                &self.config,
                self.transfer.as_ref(),
                owner,
                request.currency,
                request.amount,
                &request.address,
            )
        })?;
        info!(%owner, currency = %withdrawal.currency, amount = %withdrawal.amount, "Withdrawal sent");
        Ok(withdrawal)
    }

    pub fn account(&self, owner: UserId, currency: Currency) -> Option<Account> {
        self.store.account(owner, currency)
    }

    pub fn accounts(&self, owner: UserId) -> Vec<Account> {
        self.store.accounts_of(owner)
    }

    // ── Orders ─────────────────────────────────────────────────────────

    /// Freeze the reserve and match a new order.
    ///
    /// Returns the completed fragments split off the order followed by its
    /// final state.
    pub fn create_order(&self, owner: UserId, request: OrderRequest) -> Result<Vec<Order>, ExchangeError> {
        let terms = OrderTerms::resolve(request.price, request.amount, request.total)?;
        self.config.check_terms(&terms)?;

        let history = self.transact("create_order", |tx| {
            tx.lock_pair_accounts(owner, request.pair)?;
            let order = Order::new(
                owner,
                request.pair,
                request.side,
                terms,
                request.need_approve,
                tx.next_sequence(),
                tx.timestamp(),
            );
            ledger::freeze(tx, &order)?;
            let order_id = tx.insert_order(order);
            engine::process(tx, &self.config, order_id)
        })?;

        if let Some(order) = history.last() {
            info!(
                order_id = %order.order_id,
                %owner,
                side = %order.side,
                price = %order.price,
                status = %order.status,
                fragments = history.len() - 1,
                "Order placed"
            );
        }
        Ok(history)
    }

    pub fn cancel_order(&self, owner: UserId, order_id: OrderId) -> Result<Option<Order>, ExchangeError> {
        self.transact("cancel_order", |tx| lifecycle::cancel(tx, owner, order_id))
    }

    pub fn approve_order(&self, owner: UserId, order_id: OrderId) -> Result<Vec<Order>, ExchangeError> {
        self.transact("approve_order", |tx| approval::approve(tx, &self.config, owner, order_id))
    }

    pub fn lock_order(&self, owner: UserId, order_id: OrderId) -> Result<Option<Order>, ExchangeError> {
        self.transact("lock_order", |tx| lifecycle::lock(tx, owner, order_id))
    }

    pub fn unlock_order(&self, owner: UserId, order_id: OrderId) -> Result<Vec<Order>, ExchangeError> {
        self.transact("unlock_order", |tx| lifecycle::unlock(tx, &self.config, owner, order_id))
    }

    pub fn update_order(
        &self,
        owner: UserId,
        order_id: OrderId,
        request: UpdateRequest,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.transact("update_order", |tx| {
            lifecycle::update(tx, &self.config, owner, order_id, &request)
        })
    }

    /// Committed state of one of the owner's orders
    pub fn order(&self, owner: UserId, order_id: OrderId) -> Option<Order> {
        self.store.order(&order_id).filter(|order| order.owner == owner)
    }

    /// The owner's orders, optionally narrowed to one pair and side
    pub fn orders(&self, owner: UserId, pair: Option<Pair>, side: Option<Side>) -> Vec<Order> {
        self.store
            .orders_of(owner)
            .into_iter()
            .filter(|order| pair.map_or(true, |pair| order.pair == pair))
            .filter(|order| side.map_or(true, |side| order.side == side))
            .collect()
    }

    /// Resting amount per price level, best first
    pub fn offers(&self, pair: Pair, side: Side, depth: Option<usize>) -> Vec<Offer> {
        let depth = depth.unwrap_or(self.config.default_offers_depth);
        self.store
            .book(pair, side)
            .lock()
            .depth_snapshot(depth)
            .into_iter()
            .map(|(price, amount)| Offer { price, amount })
            .collect()
    }
}
