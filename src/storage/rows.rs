use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::domain::{Account, Currency, Entry, Transfer, User};

pub(crate) const USER_COLUMNS: &str = "username, full_name, email, created_at";
pub(crate) const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";
pub(crate) const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
pub(crate) const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    Ok(DateTime::parse_from_rfc3339(&raw)
        .with_context(|| format!("Invalid {} timestamp: {}", column, raw))?
        .with_timezone(&Utc))
}

pub(crate) fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

pub(crate) fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let currency: String = row.try_get("currency")?;

    Ok(Account {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        balance: row.try_get("balance")?,
        currency: currency
            .parse::<Currency>()
            .context("Invalid account currency")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

pub(crate) fn row_to_entry(row: &SqliteRow) -> Result<Entry> {
    Ok(Entry {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

pub(crate) fn row_to_transfer(row: &SqliteRow) -> Result<Transfer> {
    Ok(Transfer {
        id: row.try_get("id")?,
        from_account_id: row.try_get("from_account_id")?,
        to_account_id: row.try_get("to_account_id")?,
        amount: row.try_get("amount")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}
