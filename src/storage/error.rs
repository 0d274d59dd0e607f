use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::domain::{AccountId, Cents};

/// Failures surfaced by the ledger store and the transactional workflows built on it.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("after-create hook failed: {0}")]
    Hook(#[source] anyhow::Error),

    #[error("insufficient funds in account {account_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Cents,
        required: Cents,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(Cents),
}

impl LedgerError {
    /// True for failures a caller may reasonably retry as-is: busy or locked
    /// database, or no pooled connection available in time.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Transaction(sqlx::Error::PoolTimedOut) => true,
            LedgerError::Transaction(sqlx::Error::Database(db)) => db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                // SQLITE_BUSY / SQLITE_LOCKED, including their extended codes
                .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = match &err {
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => Some(db.message().to_string()),
                _ => None,
            },
            _ => None,
        };

        match (constraint, err) {
            (Some(message), _) => LedgerError::ConstraintViolation(message),
            (None, sqlx::Error::RowNotFound) => LedgerError::NotFound("row".to_string()),
            (None, err) => LedgerError::Transaction(err),
        }
    }
}
