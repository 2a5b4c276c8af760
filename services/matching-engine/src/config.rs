//! Engine configuration
//!
//! Business limits, store lock timing and the retry policy. Every field has
//! a default so a partial JSON document is enough to override one value.
//! Decimal fields are written as strings (`"0.001"`).

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::ValidationError;
use types::order::OrderTerms;

/// Retry policy for transient store contention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Re-runs allowed after the first attempt
    pub max_retries: u32,
    /// Fixed pause between attempts, in milliseconds
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1000,
            backoff_ms: 100,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Matching engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Orders must be worth strictly more than this (primary currency);
    /// matching also stops once a remainder is worth no more than this
    pub min_order_total: Decimal,
    /// Lowest accepted price
    pub price_min: Decimal,
    /// Highest accepted price
    pub price_max: Decimal,
    /// Smallest accepted withdrawal
    pub withdraw_min: Decimal,
    /// Deposits must be strictly greater than this
    pub deposit_min: Decimal,
    /// How long a transaction waits for a busy account or order row
    pub lock_wait_ms: u64,
    /// Depth returned by offer snapshots when the caller gives none
    pub default_offers_depth: usize,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_order_total: Decimal::new(1, 3),
            price_min: Decimal::new(1, 8),
            price_max: Decimal::from(5000),
            withdraw_min: Decimal::new(1, 3),
            deposit_min: Decimal::ZERO,
            lock_wait_ms: 100,
            default_offers_depth: 50,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; absent fields keep their defaults
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// Price range and minimum value checks for new or updated terms
    pub fn check_terms(&self, terms: &OrderTerms) -> Result<(), ValidationError> {
        if terms.price < self.price_min || terms.price > self.price_max {
            return Err(ValidationError::OutOfRange {
                field: "price",
                value: terms.price,
                min: self.price_min,
                max: self.price_max,
            });
        }
        if terms.total <= self.min_order_total {
            return Err(ValidationError::BelowMinimum {
                field: "total",
                value: terms.total,
                minimum: self.min_order_total,
            });
        }
        Ok(())
    }

    pub fn check_deposit(&self, amount: Decimal) -> Result<(), ValidationError> {
        if amount <= self.deposit_min {
            return Err(ValidationError::BelowMinimum {
                field: "deposit amount",
                value: amount,
                minimum: self.deposit_min,
            });
        }
        check_precision("deposit amount", amount)
    }

    pub fn check_withdrawal(&self, amount: Decimal) -> Result<(), ValidationError> {
        if amount < self.withdraw_min {
            return Err(ValidationError::BelowMinimum {
                field: "withdrawal amount",
                value: amount,
                minimum: self.withdraw_min,
            });
        }
        check_precision("withdrawal amount", amount)
    }
}

fn check_precision(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if types::numeric::fits_precision(value) {
        Ok(())
    } else {
        Err(ValidationError::Malformed(format!(
            "{field} {value} has more than 8 decimal places"
        )))
    }
}
