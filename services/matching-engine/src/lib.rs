//! Matching Engine Service
//!
//! Order matching and settlement for a two-currency exchange. Orders are
//! matched by price-time priority; every match settles inside a single
//! all-or-nothing transaction over row-locked accounts and orders.
//!
//! **Key Invariants:**
//! - `|total - amount * price| <= EPS` for every order record
//! - Account balances never go negative
//! - Balances plus open-order reserves are conserved per currency
//! - A resting order is filled by at most one transaction at a time
//!
//! # Modules
//! - `store` / `transaction`: row tables and the atomic unit of work
//! - `ledger`: balance moves, deposits, withdrawals
//! - `book` / `matching`: resting index, crossing rules, fill computation
//! - `engine`: the matching loop
//! - `lifecycle` / `approval`: owner-initiated transitions and the
//!   approval handshake
//! - `executor`: contention retries
//! - `exchange`: the public facade

pub mod approval;
pub mod book;
pub mod config;
pub mod engine;
pub mod events;
pub mod exchange;
pub mod executor;
pub mod external;
pub mod ledger;
pub mod lifecycle;
pub mod matching;
pub mod requests;
pub mod store;
pub mod transaction;

pub use config::{EngineConfig, RetryPolicy};
pub use events::ExchangeEvent;
pub use exchange::{Exchange, Offer};
pub use requests::{DepositRequest, OrderRequest, UpdateRequest, WithdrawalRequest};
