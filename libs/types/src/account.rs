//! Account and balance movement types
//!
//! One account per (owner, currency). The balance is what the owner can
//! spend right now: reserves of open orders have already been debited.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::errors::ValidationError;
use crate::ids::{AccountId, TransferId, UserId};
use crate::numeric::MAX_VALUE;

/// Currency account
///
/// Invariant: balance >= 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub owner: UserId,
    pub currency: Currency,
    pub balance: Decimal,
    /// Deposit address handed out by the provisioner
    pub address: String,
    pub created_at: i64, // Unix nanos
}

impl Account {
    /// Create an empty account
    pub fn new(owner: UserId, currency: Currency, address: impl Into<String>, timestamp: i64) -> Self {
        Self {
            account_id: AccountId::new(),
            owner,
            currency,
            balance: Decimal::ZERO,
            address: address.into(),
            created_at: timestamp,
        }
    }

    /// Credit the balance (deposit, trade proceeds, unfreeze); the balance
    /// may not exceed [`MAX_VALUE`]
    pub fn credit(&mut self, amount: Decimal) -> Result<(), ValidationError> {
        debug_assert!(amount >= Decimal::ZERO, "credit amount must be non-negative");
        let balance = self
            .balance
            .checked_add(amount)
            .filter(|balance| *balance <= MAX_VALUE)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "balance",
                value: amount,
                min: Decimal::ZERO,
                max: MAX_VALUE - self.balance,
            })?;
        self.balance = balance;
        Ok(())
    }

    /// Debit the balance (withdrawal, freeze); never goes negative
    pub fn debit(&mut self, amount: Decimal) -> Result<(), ValidationError> {
        debug_assert!(amount >= Decimal::ZERO, "debit amount must be non-negative");
        if self.balance < amount {
            return Err(ValidationError::InsufficientFunds {
                currency: self.currency,
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Check balance invariant: balance >= 0
    pub fn check_invariant(&self) -> bool {
        self.balance >= Decimal::ZERO
    }
}

/// Confirmed deposit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub deposit_id: TransferId,
    pub owner: UserId,
    pub currency: Currency,
    pub amount: Decimal,
    pub created_at: i64,
}

/// Withdrawal record, written once the debit and the external send succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub withdrawal_id: TransferId,
    pub owner: UserId,
    pub currency: Currency,
    pub amount: Decimal,
    pub address: String,
    pub created_at: i64,
}
