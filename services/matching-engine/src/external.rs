//! Collaborators the engine consumes but does not implement
//!
//! Each seam is a trait with a trivial implementation good enough for tests
//! and the standalone gateway binary.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};
use types::account::Account;
use types::currency::Currency;
use types::errors::ExchangeError;
use types::ids::UserId;

use crate::events::ExchangeEvent;

/// Fire-and-forget subscriber channel
pub trait PublicationSink: Send + Sync {
    fn publish(&self, topic: &str, event: &ExchangeEvent);
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PublicationSink for LogSink {
    fn publish(&self, topic: &str, event: &ExchangeEvent) {
        debug!(topic, ?event, "Published");
    }
}

/// Sink that records every publication, for inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    published: Mutex<Vec<(String, ExchangeEvent)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published on `topic`, oldest first
    pub fn on_topic(&self, topic: &str) -> Vec<ExchangeEvent> {
        self.published
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.published.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.lock().is_empty()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

impl PublicationSink for MemorySink {
    fn publish(&self, topic: &str, event: &ExchangeEvent) {
        self.published.lock().push((topic.to_string(), event.clone()));
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transfer of {amount} {currency} to {address} refused: {reason}")]
pub struct TransferError {
    pub amount: Decimal,
    pub currency: Currency,
    pub address: String,
    pub reason: String,
}

impl From<TransferError> for ExchangeError {
    fn from(err: TransferError) -> Self {
        ExchangeError::TransferFailed(err.to_string())
    }
}

/// Outbound payment rail, called once a withdrawal debit is in place
pub trait TransferClient: Send + Sync {
    fn send(&self, amount: Decimal, address: &str, currency: Currency) -> Result<(), TransferError>;
}

/// Transfer client that accepts every send
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTransferClient;

impl TransferClient for LoggingTransferClient {
    fn send(&self, amount: Decimal, address: &str, currency: Currency) -> Result<(), TransferError> {
        info!(%amount, address, %currency, "Transfer sent");
        Ok(())
    }
}

/// Source of fresh accounts (and their deposit addresses)
pub trait AccountProvisioner: Send + Sync {
    fn assign_account(&self, owner: UserId, currency: Currency, timestamp: i64) -> Result<Account, ExchangeError>;
}

/// Provisioner that makes up a unique address per account
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneratedAddresses;

impl AccountProvisioner for GeneratedAddresses {
    fn assign_account(&self, owner: UserId, currency: Currency, timestamp: i64) -> Result<Account, ExchangeError> {
        let address = format!("{currency}:{}", uuid::Uuid::now_v7().simple());
        Ok(Account::new(owner, currency, address, timestamp))
    }
}
