#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use matching_engine::external::MemorySink;
use matching_engine::{DepositRequest, EngineConfig, Exchange, OrderRequest, RetryPolicy};
use rust_decimal::Decimal;
use types::currency::{Currency, Pair};
use types::ids::{OrderId, UserId};
use types::order::{Order, OrderStatus, Side};

pub fn d(s: &str) -> Decimal {
    Decimal::from_str_exact(s).unwrap()
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        lock_wait_ms: 50,
        retry: RetryPolicy {
            max_retries: 1000,
            backoff_ms: 1,
        },
        ..EngineConfig::default()
    }
}

pub fn order_request(side: Side, price: &str, amount: &str, need_approve: bool) -> OrderRequest {
    OrderRequest {
        pair: Pair::btc_eth(),
        side,
        price: d(price),
        amount: Some(d(amount)),
        total: None,
        need_approve,
    }
}

pub struct Market {
    pub exchange: Exchange,
    pub sink: Arc<MemorySink>,
}

impl Market {
    pub fn new() -> Self {
        let sink = Arc::new(MemorySink::new());
        let exchange = Exchange::with_config(test_config()).with_sink(sink.clone());
        Self { exchange, sink }
    }

    /// A user with both accounts, funded with the given balances
    pub fn user(&self, btc: &str, eth: &str) -> UserId {
        let owner = UserId::new();
        for (currency, amount) in [(Currency::BTC, btc), (Currency::ETH, eth)] {
            self.exchange.create_account(owner, currency).unwrap();
            if d(amount) > Decimal::ZERO {
                self.exchange
                    .deposit(owner, DepositRequest { currency, amount: d(amount) })
                    .unwrap();
            }
        }
        owner
    }

    pub fn buy(&self, owner: UserId, price: &str, amount: &str) -> Vec<Order> {
        self.exchange
            .create_order(owner, order_request(Side::BUY, price, amount, false))
            .unwrap()
    }

    pub fn sell(&self, owner: UserId, price: &str, amount: &str) -> Vec<Order> {
        self.exchange
            .create_order(owner, order_request(Side::SELL, price, amount, false))
            .unwrap()
    }

    pub fn balance(&self, owner: UserId, currency: Currency) -> Decimal {
        self.exchange.account(owner, currency).unwrap().balance
    }

    pub fn order(&self, order_id: OrderId) -> Order {
        self.exchange.store().order(&order_id).unwrap()
    }

    pub fn status(&self, order_id: OrderId) -> OrderStatus {
        self.order(order_id).status
    }

    /// Balances plus live reserves, per currency, must equal net deposits;
    /// no balance is negative and every order keeps its value invariant
    pub fn assert_conserved(&self) {
        let store = self.exchange.store();
        let mut held: HashMap<Currency, Decimal> = HashMap::new();

        for account in store.all_accounts() {
            assert!(account.balance >= Decimal::ZERO, "negative balance: {account:?}");
            *held.entry(account.currency).or_default() += account.balance;
        }
        for order in store.all_orders() {
            assert!(order.check_invariant(), "value invariant broken: {order:?}");
            if order.status.holds_reserve() {
                *held.entry(order.from_currency()).or_default() += order.reserve();
            }
        }

        let mut net: HashMap<Currency, Decimal> = HashMap::new();
        for deposit in store.deposits() {
            *net.entry(deposit.currency).or_default() += deposit.amount;
        }
        for withdrawal in store.withdrawals() {
            *net.entry(withdrawal.currency).or_default() -= withdrawal.amount;
        }

        for currency in Currency::ALL {
            assert_eq!(
                held.get(&currency).copied().unwrap_or_default(),
                net.get(&currency).copied().unwrap_or_default(),
                "{currency} not conserved"
            );
        }
    }
}
