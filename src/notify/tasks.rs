use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Account, Cents, Currency, User, mask_account_id};

/// Queue a task is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
    Critical,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub queue: Queue,
    pub max_retry: u32,
    /// Delay before the task becomes eligible to run
    pub process_in: Duration,
}

impl TaskOptions {
    /// Options used for customer-facing emails.
    pub fn critical() -> Self {
        Self {
            queue: Queue::Critical,
            max_retry: 10,
            process_in: Duration::from_secs(10),
        }
    }
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            queue: Queue::Default,
            max_retry: 3,
            process_in: Duration::ZERO,
        }
    }
}

/// Notification tasks produced by the account workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Task {
    #[serde(rename = "task:send_account_created_email")]
    AccountCreatedEmail {
        username: String,
        account_id: String,
        balance: Cents,
        currency: Currency,
    },

    #[serde(rename = "task:send_balance_added_email")]
    BalanceAddedEmail {
        username: String,
        account_id: String,
        added_balance: Cents,
        currency: Currency,
        new_balance: Cents,
    },

    #[serde(rename = "task:send_verify_email")]
    VerifyEmail { username: String, email: String },
}

impl Task {
    pub fn account_created(account: &Account) -> Self {
        Task::AccountCreatedEmail {
            username: account.owner.clone(),
            account_id: mask_account_id(account.id),
            balance: account.balance,
            currency: account.currency,
        }
    }

    pub fn balance_added(account: &Account, added: Cents) -> Self {
        Task::BalanceAddedEmail {
            username: account.owner.clone(),
            account_id: mask_account_id(account.id),
            added_balance: added,
            currency: account.currency,
            new_balance: account.balance,
        }
    }

    pub fn verify_email(user: &User) -> Self {
        Task::VerifyEmail {
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::AccountCreatedEmail { .. } => "task:send_account_created_email",
            Task::BalanceAddedEmail { .. } => "task:send_balance_added_email",
            Task::VerifyEmail { .. } => "task:send_verify_email",
        }
    }
}
