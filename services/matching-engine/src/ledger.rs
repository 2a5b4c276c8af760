//! Account ledger
//!
//! Balance moves on accounts held by a [`Transaction`], plus the account,
//! deposit and withdrawal flows built on them.
//!
//! "Freeze" debits an order's reserve from its from-account when the order
//! is created or updated; "unfreeze" credits it back on cancel or update.
//! Matching never debits: the seller's and buyer's value were frozen up
//! front and a fill only releases it.

use rust_decimal::Decimal;
use tracing::{error, info};
use types::account::{Account, Deposit, Withdrawal};
use types::currency::Currency;
use types::errors::ExchangeError;
use types::ids::{TransferId, UserId};
use types::order::Order;

use crate::config::EngineConfig;
use crate::events::ExchangeEvent;
use crate::external::{AccountProvisioner, TransferClient};
use crate::store::Store;
use crate::transaction::Transaction;

/// Credit a held account; zero is a no-op
pub fn credit(tx: &mut Transaction<'_>, owner: UserId, currency: Currency, amount: Decimal) -> Result<(), ExchangeError> {
    if amount.is_zero() {
        return Ok(());
    }
    tx.account_mut(owner, currency)?.credit(amount)?;
    Ok(())
}

/// Debit a held account; fails with `InsufficientFunds` instead of going negative
pub fn debit(tx: &mut Transaction<'_>, owner: UserId, currency: Currency, amount: Decimal) -> Result<(), ExchangeError> {
    tx.account_mut(owner, currency)?.debit(amount)?;
    Ok(())
}

pub fn freeze(tx: &mut Transaction<'_>, order: &Order) -> Result<(), ExchangeError> {
    debit(tx, order.owner, order.from_currency(), order.reserve())
}

pub fn unfreeze(tx: &mut Transaction<'_>, order: &Order) -> Result<(), ExchangeError> {
    credit(tx, order.owner, order.from_currency(), order.reserve())
}

/// Open an account, or report the one that already exists
pub fn create_account(
    store: &Store,
    provisioner: &dyn AccountProvisioner,
    owner: UserId,
    currency: Currency,
    timestamp: i64,
) -> Result<Account, ExchangeError> {
    if let Some(existing) = store.account(owner, currency) {
        return Err(ExchangeError::AlreadyExists(Box::new(existing)));
    }
    let account = provisioner.assign_account(owner, currency, timestamp)?;
    store
        .insert_account(account.clone())
        .map_err(|existing| ExchangeError::AlreadyExists(Box::new(existing)))?;
    info!(%owner, %currency, account_id = %account.account_id, "Account created");
    Ok(account)
}

pub fn deposit(
    tx: &mut Transaction<'_>,
    config: &EngineConfig,
    owner: UserId,
    currency: Currency,
    amount: Decimal,
) -> Result<Deposit, ExchangeError> {
    config.check_deposit(amount)?;
    tx.lock_accounts(owner, &[currency])?;
    credit(tx, owner, currency, amount)?;

    let deposit = Deposit {
        deposit_id: TransferId::new(),
        owner,
        currency,
        amount,
        created_at: tx.timestamp(),
    };
    tx.record_deposit(deposit.clone());
    tx.publish(ExchangeEvent::DepositConfirmed(deposit.clone()));
    Ok(deposit)
}

/// Debit, then hand the payment to the transfer rail.
///
/// A refused send fails the call; the caller's transaction then rolls the
/// debit back.
pub fn withdraw(
    tx: &mut Transaction<'_>,
    config: &EngineConfig,
    transfer: &dyn TransferClient,
    owner: UserId,
    currency: Currency,
    amount: Decimal,
    address: &str,
) -> Result<Withdrawal, ExchangeError> {
    config.check_withdrawal(amount)?;
    tx.lock_accounts(owner, &[currency])?;
    debit(tx, owner, currency, amount)?;

    if let Err(err) = transfer.send(amount, address, currency) {
        error!(%owner, %currency, %amount, error = %err, "Withdrawal transfer failed");
        return Err(err.into());
    }

    let withdrawal = Withdrawal {
        withdrawal_id: TransferId::new(),
        owner,
        currency,
        amount,
        address: address.to_string(),
        created_at: tx.timestamp(),
    };
    tx.record_withdrawal(withdrawal.clone());
    tx.publish(ExchangeEvent::WithdrawalSent(withdrawal.clone()));
    Ok(withdrawal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{GeneratedAddresses, LoggingTransferClient, MemorySink, TransferError};
    use std::time::Duration;
    use types::errors::ValidationError;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    struct RefusingTransfer;

    impl TransferClient for RefusingTransfer {
        fn send(&self, amount: Decimal, address: &str, currency: Currency) -> Result<(), TransferError> {
            Err(TransferError {
                amount,
                currency,
                address: address.to_string(),
                reason: "rail down".to_string(),
            })
        }
    }

    fn funded(store: &Store, owner: UserId, btc: &str) {
        create_account(store, &GeneratedAddresses, owner, Currency::BTC, 1).unwrap();
        let mut tx = Transaction::begin(store, Duration::from_millis(20));
        deposit(&mut tx, &EngineConfig::default(), owner, Currency::BTC, d(btc)).unwrap();
        tx.commit(&MemorySink::new());
    }

    #[test]
    fn test_create_account_twice_returns_existing() {
        let store = Store::new();
        let owner = UserId::new();
        let account = create_account(&store, &GeneratedAddresses, owner, Currency::ETH, 1).unwrap();
        match create_account(&store, &GeneratedAddresses, owner, Currency::ETH, 2) {
            Err(ExchangeError::AlreadyExists(existing)) => assert_eq!(*existing, account),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn test_deposit_credits_and_records() {
        let store = Store::new();
        let owner = UserId::new();
        funded(&store, owner, "10");
        assert_eq!(store.account(owner, Currency::BTC).unwrap().balance, d("10"));
        assert_eq!(store.deposits().len(), 1);
    }

    #[test]
    fn test_deposit_must_be_positive() {
        let store = Store::new();
        let owner = UserId::new();
        create_account(&store, &GeneratedAddresses, owner, Currency::BTC, 1).unwrap();
        let mut tx = Transaction::begin(&store, Duration::from_millis(20));
        let err = deposit(&mut tx, &EngineConfig::default(), owner, Currency::BTC, d("0")).unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(ValidationError::BelowMinimum { .. })));
    }

    #[test]
    fn test_deposit_past_storage_range_is_rejected() {
        let store = Store::new();
        let owner = UserId::new();
        funded(&store, owner, "999999999999999999");

        let mut tx = Transaction::begin(&store, Duration::from_millis(20));
        let err = deposit(&mut tx, &EngineConfig::default(), owner, Currency::BTC, d("2")).unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(ValidationError::OutOfRange { field: "balance", .. })));
        drop(tx);

        let mut tx = Transaction::begin(&store, Duration::from_millis(20));
        let huge = d("79228162514264337593543950335");
        assert!(deposit(&mut tx, &EngineConfig::default(), owner, Currency::BTC, huge).is_err());
        drop(tx);

        assert_eq!(store.account(owner, Currency::BTC).unwrap().balance, d("999999999999999999"));
        assert_eq!(store.deposits().len(), 1);
    }

    #[test]
    fn test_withdraw_debits() {
        let store = Store::new();
        let owner = UserId::new();
        funded(&store, owner, "10");

        let mut tx = Transaction::begin(&store, Duration::from_millis(20));
        let withdrawal = withdraw(&mut tx, &EngineConfig::default(), &LoggingTransferClient, owner, Currency::BTC, d("4"), "dest").unwrap();
        tx.commit(&MemorySink::new());

        assert_eq!(withdrawal.address, "dest");
        assert_eq!(store.account(owner, Currency::BTC).unwrap().balance, d("6"));
        assert_eq!(store.withdrawals().len(), 1);
    }

    #[test]
    fn test_withdraw_more_than_balance_fails() {
        let store = Store::new();
        let owner = UserId::new();
        funded(&store, owner, "1");

        let mut tx = Transaction::begin(&store, Duration::from_millis(20));
        let err = withdraw(&mut tx, &EngineConfig::default(), &LoggingTransferClient, owner, Currency::BTC, d("999"), "dest").unwrap_err();
        assert!(matches!(err, ExchangeError::Validation(ValidationError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_refused_transfer_rolls_back() {
        let store = Store::new();
        let owner = UserId::new();
        funded(&store, owner, "10");

        {
            let mut tx = Transaction::begin(&store, Duration::from_millis(20));
            let err = withdraw(&mut tx, &EngineConfig::default(), &RefusingTransfer, owner, Currency::BTC, d("4"), "dest").unwrap_err();
            assert!(matches!(err, ExchangeError::TransferFailed(_)));
        }
        assert_eq!(store.account(owner, Currency::BTC).unwrap().balance, d("10"));
        assert!(store.withdrawals().is_empty());
    }
}
