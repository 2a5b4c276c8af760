//! Types library for the exchange settlement engine
//!
//! Core type definitions shared by the engine and the gateway.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, AccountId, UserId, TransferId)
//! - `numeric`: Decimal precision helpers and `EPS`
//! - `currency`: Currencies and trading pairs
//! - `order`: Order record, terms and status
//! - `account`: Accounts, deposits and withdrawals
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod currency;
pub mod order;
pub mod account;
pub mod errors;

