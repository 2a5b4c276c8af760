//! Published events and the transaction outbox
//!
//! Events are staged in an [`Outbox`] while a transaction runs and handed to
//! the sink only after it commits. A rolled-back transaction discards its
//! outbox, so subscribers never see state that did not happen.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::account::{Deposit, Withdrawal};
use types::currency::{Currency, Pair};
use types::ids::UserId;
use types::order::{Order, Side};

/// Event delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExchangeEvent {
    /// Committed state of an order record that changed
    OrderChanged(Order),
    /// An order record reached COMPLETED
    HistoryAppended(Order),
    /// New aggregate of a price level (zero when the level emptied)
    OfferChanged {
        pair: Pair,
        side: Side,
        price: Decimal,
        amount: Decimal,
    },
    BalanceChanged {
        owner: UserId,
        currency: Currency,
        balance: Decimal,
    },
    DepositConfirmed(Deposit),
    WithdrawalSent(Withdrawal),
}

impl ExchangeEvent {
    /// Topic the event is published on
    pub fn topic(&self) -> String {
        match self {
            ExchangeEvent::OrderChanged(order) => orders_topic(order.pair),
            ExchangeEvent::HistoryAppended(order) => history_topic(order.pair, order.side),
            ExchangeEvent::OfferChanged { pair, side, .. } => offers_topic(*pair, *side),
            ExchangeEvent::BalanceChanged { owner, .. } => accounts_topic(*owner),
            ExchangeEvent::DepositConfirmed(deposit) => accounts_topic(deposit.owner),
            ExchangeEvent::WithdrawalSent(withdrawal) => accounts_topic(withdrawal.owner),
        }
    }
}

pub fn history_topic(pair: Pair, side: Side) -> String {
    format!("history_{pair}_{side}")
}

pub fn orders_topic(pair: Pair) -> String {
    format!("orders_{pair}")
}

pub fn offers_topic(pair: Pair, side: Side) -> String {
    format!("offers_{pair}_{side}")
}

pub fn accounts_topic(owner: UserId) -> String {
    format!("accounts_{owner}")
}

/// Staged publications of one transaction
#[derive(Debug, Default)]
pub struct Outbox {
    staged: Vec<ExchangeEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ExchangeEvent) {
        self.staged.push(event);
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Take everything staged, in staging order
    pub fn drain(&mut self) -> Vec<ExchangeEvent> {
        std::mem::take(&mut self.staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::OrderTerms;

    fn order(side: Side) -> Order {
        let terms = OrderTerms::resolve(Decimal::ONE, Some(Decimal::ONE), None).unwrap();
        Order::new(UserId::new(), Pair::btc_eth(), side, terms, false, 1, 1708123456789000000)
    }

    #[test]
    fn test_topics() {
        assert_eq!(
            ExchangeEvent::HistoryAppended(order(Side::SELL)).topic(),
            "history_btc_eth_sell"
        );
        assert_eq!(ExchangeEvent::OrderChanged(order(Side::BUY)).topic(), "orders_btc_eth");
        let offer = ExchangeEvent::OfferChanged {
            pair: Pair::btc_eth(),
            side: Side::BUY,
            price: Decimal::ONE,
            amount: Decimal::ZERO,
        };
        assert_eq!(offer.topic(), "offers_btc_eth_buy");

        let owner = UserId::new();
        let balance = ExchangeEvent::BalanceChanged {
            owner,
            currency: Currency::BTC,
            balance: Decimal::ONE,
        };
        assert_eq!(balance.topic(), format!("accounts_{owner}"));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ExchangeEvent::OfferChanged {
            pair: Pair::btc_eth(),
            side: Side::SELL,
            price: Decimal::new(5, 1),
            amount: Decimal::from(3),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "offer_changed");
        assert_eq!(json["pair"], "btc_eth");
        assert_eq!(json["price"], "0.5");
    }

    #[test]
    fn test_outbox_drain_empties() {
        let mut outbox = Outbox::new();
        outbox.push(ExchangeEvent::OrderChanged(order(Side::BUY)));
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.drain().len(), 1);
        assert!(outbox.is_empty());
    }
}
