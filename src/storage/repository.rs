use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::debug;

use crate::config::StoreConfig;
use crate::domain::{Account, AccountId, Entry, Transfer, TransferId, User};

use super::rows::{
    ACCOUNT_COLUMNS, ENTRY_COLUMNS, TRANSFER_COLUMNS, USER_COLUMNS, row_to_account, row_to_entry,
    row_to_transfer, row_to_user,
};
use super::{Ledger, LedgerError, MIGRATION_001_INITIAL, SqliteTx};

/// SQLite-backed ledger store.
///
/// Writes go through units of work opened with [`Ledger::begin`]; the
/// methods here are plain reads against the pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database described by `config`.
    /// `create` allows creating the database file if it doesn't exist.
    pub async fn connect(config: &StoreConfig, create: bool) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options(create))
            .await
            .with_context(|| format!("Failed to connect to {}", config.database.display()))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(config, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Users
    // ========================

    pub async fn get_user(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        row.as_ref().map(row_to_user).transpose()
    }

    // ========================
    // Accounts
    // ========================

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(row_to_account).transpose()
    }

    /// List accounts ordered by id, optionally restricted to one owner.
    pub async fn list_accounts(
        &self,
        owner: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>> {
        let mut query = format!("SELECT {} FROM accounts", ACCOUNT_COLUMNS);
        if owner.is_some() {
            query.push_str(" WHERE owner = ?");
        }
        query.push_str(" ORDER BY id LIMIT ? OFFSET ?");

        let mut sql_query = sqlx::query(&query);
        if let Some(owner) = owner {
            sql_query = sql_query.bind(owner);
        }

        let rows = sql_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter().map(row_to_account).collect()
    }

    /// Sum of every account balance in a currency. Transfers never change it.
    pub async fn total_balance(&self, currency: &str) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(balance), 0) FROM accounts WHERE currency = ?",
        )
        .bind(currency)
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum balances")?;
        Ok(total)
    }

    // ========================
    // Entries
    // ========================

    /// List an account's entries, oldest first.
    pub async fn list_entries(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Entry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM entries WHERE account_id = ? ORDER BY id LIMIT ? OFFSET ?",
            ENTRY_COLUMNS
        ))
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list entries")?;

        rows.iter().map(row_to_entry).collect()
    }

    /// Sum of an account's entries. For a consistent ledger this equals
    /// the balance minus any direct deposits.
    pub async fn sum_entries(&self, account_id: AccountId) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM entries WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to sum entries")?;
        Ok(total)
    }

    // ========================
    // Transfers
    // ========================

    pub async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transfers WHERE id = ?",
            TRANSFER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transfer")?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    /// List transfers touching an account (as source or destination),
    /// or all transfers when `account_id` is `None`.
    pub async fn list_transfers(
        &self,
        account_id: Option<AccountId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>> {
        let mut query = format!("SELECT {} FROM transfers", TRANSFER_COLUMNS);
        if account_id.is_some() {
            query.push_str(" WHERE from_account_id = ? OR to_account_id = ?");
        }
        query.push_str(" ORDER BY id LIMIT ? OFFSET ?");

        let mut sql_query = sqlx::query(&query);
        if let Some(id) = account_id {
            sql_query = sql_query.bind(id).bind(id);
        }

        let rows = sql_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transfers")?;

        rows.iter().map(row_to_transfer).collect()
    }

    pub async fn count_transfers(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transfers")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transfers")?;
        Ok(count)
    }

    pub async fn count_entries(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count entries")?;
        Ok(count)
    }
}

#[async_trait]
impl Ledger for Repository {
    type Tx = SqliteTx;

    async fn begin(&self) -> Result<SqliteTx, LedgerError> {
        let tx = self.pool.begin().await?;
        debug!("transaction started");
        Ok(SqliteTx::new(tx))
    }
}
