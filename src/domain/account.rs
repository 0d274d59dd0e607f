use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, Currency};

pub type AccountId = i64;

/// A bank account. The balance is only ever changed by the store's
/// balance-adjustment primitive inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Username of the owning user
    pub owner: String,
    /// Current balance in minor units
    pub balance: Cents,
    /// Fixed at creation
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub owner: String,
    pub currency: Currency,
}

/// Signed balance adjustment for a single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAccountBalanceParams {
    pub account_id: AccountId,
    pub amount: Cents,
}

/// Last four digits of the account id, for notifications that must not
/// expose the full number.
pub fn mask_account_id(id: AccountId) -> String {
    let digits = id.to_string();
    let tail = &digits[digits.len().saturating_sub(4)..];
    format!("xxxx{}", tail)
}
