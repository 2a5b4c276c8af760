//! Error types for the exchange engine
//!
//! Comprehensive error taxonomy using thiserror. Only
//! [`ExchangeError::Contention`] is retryable; everything else is surfaced
//! to the caller as-is.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::Account;
use crate::currency::Currency;
use crate::ids::OrderId;
use crate::order::OrderStatus;

/// Caller input or business-rule violation. Never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Not enough money in {currency}: required {required}, available {available}")]
    InsufficientFunds {
        currency: Currency,
        required: Decimal,
        available: Decimal,
    },

    #[error("{field} {value} lower than {minimum}")]
    BelowMinimum {
        field: &'static str,
        value: Decimal,
        minimum: Decimal,
    },

    #[error("{field} {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Order {order_id} in status '{status}' can't be {action}")]
    IllegalStatus {
        order_id: OrderId,
        status: OrderStatus,
        action: &'static str,
    },
}

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Lock failure: order {order_id} is '{status}'")]
    LockFailure { order_id: OrderId, status: OrderStatus },

    #[error("Unlock failure: order {order_id} is '{status}'")]
    UnlockFailure { order_id: OrderId, status: OrderStatus },

    #[error("Update failure: you can't modify orders in status '{status}' ({order_id})")]
    UpdateFailure { order_id: OrderId, status: OrderStatus },

    #[error("Already exists: {} account {}", .0.currency, .0.account_id)]
    AlreadyExists(Box<Account>),

    #[error("Store contention: {0}")]
    Contention(String),

    #[error("Gave up after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    #[error("External transfer failed: {0}")]
    TransferFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    /// Transient store contention; the whole transaction may be re-run
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeError::Contention(_))
    }

    /// Stable machine-readable code for error payloads
    pub fn code(&self) -> &'static str {
        match self {
            ExchangeError::Validation(_) => "VALIDATION_ERROR",
            ExchangeError::LockFailure { .. } => "LOCK_FAILURE",
            ExchangeError::UnlockFailure { .. } => "UNLOCK_FAILURE",
            ExchangeError::UpdateFailure { .. } => "UPDATE_FAILURE",
            ExchangeError::AlreadyExists(_) => "ALREADY_EXISTS",
            ExchangeError::Contention(_) => "CONTENTION",
            ExchangeError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            ExchangeError::TransferFailed(_) => "TRANSFER_FAILED",
            ExchangeError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP-equivalent status class
    pub fn status_code(&self) -> u16 {
        match self {
            ExchangeError::Validation(_)
            | ExchangeError::LockFailure { .. }
            | ExchangeError::UnlockFailure { .. }
            | ExchangeError::UpdateFailure { .. } => 400,
            ExchangeError::AlreadyExists(_) => 409,
            ExchangeError::Contention(_)
            | ExchangeError::RetriesExhausted { .. }
            | ExchangeError::Internal(_) => 500,
            ExchangeError::TransferFailed(_) => 502,
        }
    }
}
