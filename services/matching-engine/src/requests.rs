//! Typed operation inputs
//!
//! Parsed and range-checked by the caller's edge (the gateway); the engine
//! still validates business rules.

use rust_decimal::Decimal;
use types::currency::{Currency, Pair};
use types::order::Side;

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub pair: Pair,
    pub side: Side,
    pub price: Decimal,
    /// Exactly one of `amount` and `total` must be set
    pub amount: Option<Decimal>,
    pub total: Option<Decimal>,
    pub need_approve: bool,
}

/// New terms for a live order; unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    pub currency: Currency,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalRequest {
    pub currency: Currency,
    pub amount: Decimal,
    pub address: String,
}
