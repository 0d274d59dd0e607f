use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::ErrorKind;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::domain::{
    Account, AccountId, Cents, CreateAccountParams, CreateUserParams, Entry, Transfer,
    TransferRequest, User,
};

use super::rows::{
    ACCOUNT_COLUMNS, ENTRY_COLUMNS, TRANSFER_COLUMNS, USER_COLUMNS, row_to_account, row_to_entry,
    row_to_transfer, row_to_user,
};
use super::{LedgerError, Queries, UnitOfWork};

/// A unit of work on the SQLite store.
///
/// SQLite locks at database granularity: the first write statement takes the
/// write lock and keeps it until commit or rollback, so the balance update
/// below is at least as strong as a row lock. A dropped `SqliteTx` rolls back.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTx {
    pub fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Queries for SqliteTx {
    async fn create_user(&mut self, params: &CreateUserParams) -> Result<User, LedgerError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (username, full_name, email, created_at) VALUES (?, ?, ?, ?) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&params.username)
        .bind(&params.full_name)
        .bind(&params.email)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row_to_user(&row)?)
    }

    async fn get_user(&mut self, username: &str) -> Result<User, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("user {}", username)))?;

        Ok(row_to_user(&row)?)
    }

    async fn create_account(
        &mut self,
        params: &CreateAccountParams,
    ) -> Result<Account, LedgerError> {
        let row = sqlx::query(&format!(
            "INSERT INTO accounts (owner, balance, currency, created_at) VALUES (?, 0, ?, ?) RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(&params.owner)
        .bind(params.currency.as_str())
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|err| {
            let missing_owner = matches!(
                &err,
                sqlx::Error::Database(db) if matches!(db.kind(), ErrorKind::ForeignKeyViolation)
            );
            if missing_owner {
                LedgerError::NotFound(format!("user {}", params.owner))
            } else {
                LedgerError::from(err)
            }
        })?;

        Ok(row_to_account(&row)?)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))?;

        Ok(row_to_account(&row)?)
    }

    async fn add_account_balance(
        &mut self,
        id: AccountId,
        amount: Cents,
    ) -> Result<Account, LedgerError> {
        debug!(account_id = id, amount, "adjusting balance");

        let row = sqlx::query(&format!(
            "UPDATE accounts SET balance = balance + ? WHERE id = ? RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(amount)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))?;

        Ok(row_to_account(&row)?)
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: Cents,
    ) -> Result<Entry, LedgerError> {
        let row = sqlx::query(&format!(
            "INSERT INTO entries (account_id, amount, created_at) VALUES (?, ?, ?) RETURNING {}",
            ENTRY_COLUMNS
        ))
        .bind(account_id)
        .bind(amount)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row_to_entry(&row)?)
    }

    async fn create_transfer(
        &mut self,
        request: &TransferRequest,
    ) -> Result<Transfer, LedgerError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transfers (from_account_id, to_account_id, amount, created_at) VALUES (?, ?, ?, ?) RETURNING {}",
            TRANSFER_COLUMNS
        ))
        .bind(request.from_account_id)
        .bind(request.to_account_id)
        .bind(request.amount)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row_to_transfer(&row)?)
    }
}

#[async_trait]
impl UnitOfWork for SqliteTx {
    async fn commit(self) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
