//! Order types
//!
//! An order quotes `price` in primary per unit of secondary. `amount` is the
//! remaining secondary quantity, `total` the matching primary value, kept
//! equal to `round8(amount * price)`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::currency::{Currency, Pair};
use crate::errors::ValidationError;
use crate::ids::{OrderId, UserId};
use crate::numeric::{checked_value_of, fits_precision, trunc8, within_eps, MAX_VALUE};

/// Order side (buyer or seller of the secondary currency)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid): spends primary, receives secondary
    BUY,
    /// Sell order (ask): spends secondary, receives primary
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::BUY => "buy",
            Side::SELL => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status
///
/// ```text
/// INIT ──► PENDING ──► COMPLETED
///   │  ╲      │  ╲
///   │   ╲     │   ► APPROVING ──► APPROVED ──► (merge)
///   │    ► LOCKED ──► INIT (unlock)
///   └───────┴──────► CANCELED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted, reserve frozen, not yet matched
    Init,
    /// Resting in the book with an unmatched remainder
    Pending,
    /// Matched, waiting for the approval handshake
    Approving,
    /// Approved by its owner, waiting for the counterparty
    Approved,
    /// Manually held out of the book
    Locked,
    /// Fully filled (terminal)
    Completed,
    /// Withdrawn by its owner (terminal)
    Canceled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }

    /// Non-terminal orders keep their reserve frozen
    pub fn holds_reserve(&self) -> bool {
        !self.is_terminal()
    }

    /// Part of a pending approval handshake
    pub fn in_approval(&self) -> bool {
        matches!(self, OrderStatus::Approving | OrderStatus::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Init => "init",
            OrderStatus::Pending => "pending",
            OrderStatus::Approving => "approving",
            OrderStatus::Approved => "approved",
            OrderStatus::Locked => "locked",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role an order played when a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The incoming order that triggered the match
    Taker,
    /// The resting order; trades execute at its price
    Maker,
}

/// Back-link to the counterparty of a match awaiting approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub order_id: OrderId,
    /// Role of the order holding this link
    pub role: Role,
}

/// Price, amount and total of an order, always mutually consistent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerms {
    pub price: Decimal,
    pub amount: Decimal,
    pub total: Decimal,
}

impl OrderTerms {
    /// Build terms from a price and exactly one of amount or total.
    ///
    /// A given total is converted to the largest amount that does not
    /// exceed it, then the total is recomputed from that amount.
    pub fn resolve(
        price: Decimal,
        amount: Option<Decimal>,
        total: Option<Decimal>,
    ) -> Result<Self, ValidationError> {
        check_positive("price", price)?;

        let amount = match (amount, total) {
            (Some(amount), None) => {
                check_positive("amount", amount)?;
                amount
            }
            (None, Some(total)) => {
                check_positive("total", total)?;
                check_bounded("total", total)?;
                trunc8(total / price)
            }
            (Some(_), Some(_)) => {
                return Err(ValidationError::Malformed(
                    "specify either amount or total, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ValidationError::Malformed(
                    "you should specify amount or total".to_string(),
                ))
            }
        };

        check_bounded("amount", amount)?;
        let total = checked_value_of(amount, price).unwrap_or(Decimal::MAX);
        check_bounded("total", total)?;

        Ok(Self { price, amount, total })
    }
}

fn check_bounded(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value > MAX_VALUE {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: Decimal::ZERO,
            max: MAX_VALUE,
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::Malformed(format!(
            "{field} must be positive, got {value}"
        )));
    }
    if !fits_precision(value) {
        return Err(ValidationError::Malformed(format!(
            "{field} {value} has more than 8 decimal places"
        )));
    }
    Ok(())
}

/// Order record
///
/// The same type holds live orders and the immutable completed fragments
/// split off them during settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub owner: UserId,
    pub pair: Pair,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub need_approve: bool,
    pub link: Option<Link>,
    /// Store-wide creation sequence, the time-priority tie-break
    pub sequence: u64,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Order {
    /// Create a new order in INIT status
    pub fn new(
        owner: UserId,
        pair: Pair,
        side: Side,
        terms: OrderTerms,
        need_approve: bool,
        sequence: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            owner,
            pair,
            side,
            price: terms.price,
            amount: terms.amount,
            total: terms.total,
            status: OrderStatus::Init,
            need_approve,
            link: None,
            sequence,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Currency spent (and frozen) by this order
    pub fn from_currency(&self) -> Currency {
        match self.side {
            Side::BUY => self.pair.primary(),
            Side::SELL => self.pair.secondary(),
        }
    }

    /// Currency received by this order
    pub fn to_currency(&self) -> Currency {
        match self.side {
            Side::BUY => self.pair.secondary(),
            Side::SELL => self.pair.primary(),
        }
    }

    /// Frozen from-currency value backing the remainder
    pub fn reserve(&self) -> Decimal {
        match self.side {
            Side::BUY => self.total,
            Side::SELL => self.amount,
        }
    }

    pub fn set_terms(&mut self, terms: OrderTerms) {
        self.price = terms.price;
        self.amount = terms.amount;
        self.total = terms.total;
    }

    /// Check value invariant: total = amount * price within EPS, both >= 0
    pub fn check_invariant(&self) -> bool {
        self.amount >= Decimal::ZERO
            && self.total >= Decimal::ZERO
            && within_eps(self.total, self.amount * self.price)
    }

    /// Build a completed history record for `amount` filled units
    pub fn fragment(&self, amount: Decimal, total: Decimal, sequence: u64, timestamp: i64) -> Order {
        Order {
            order_id: OrderId::new(),
            amount,
            total,
            status: OrderStatus::Completed,
            link: None,
            sequence,
            created_at: timestamp,
            updated_at: timestamp,
            ..self.clone()
        }
    }
}
