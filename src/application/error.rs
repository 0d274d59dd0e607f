use thiserror::Error;

use crate::domain::{AccountId, Cents, Currency, TransferId, UnsupportedCurrency};
use crate::storage::LedgerError;

/// Request-level failures reported by [`super::BankService`].
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Account already exists for {owner} in {currency}")]
    AccountAlreadyExists { owner: String, currency: Currency },

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Account {account_id} currency mismatch: {actual} vs {expected}")]
    CurrencyMismatch {
        account_id: AccountId,
        actual: Currency,
        expected: Currency,
    },

    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Cents),

    #[error("Invalid page: page_id {page_id}, page_size {page_size}")]
    InvalidPage { page_id: i64, page_size: i64 },

    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    #[error(transparent)]
    UnsupportedCurrency(#[from] UnsupportedCurrency),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
