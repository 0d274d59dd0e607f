// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use bankcore::application::{BankService, NoopHook, TransferEngine};
use bankcore::config::StoreConfig;
use bankcore::domain::{
    Account, AccountId, AddAccountBalanceParams, Cents, CreateAccountParams, CreateUserParams,
    Currency, Entry, Transfer, TransferRequest, User,
};
use bankcore::notify::{TaskReceiver, task_queue};
use bankcore::storage::{Ledger, LedgerError, Queries, Repository, UnitOfWork};
use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::OwnedMutexGuard;

// ========================
// SQLite fixtures
// ========================

/// Helper to create a migrated repository in a temporary directory
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = StoreConfig::new(temp_dir.path().join("test.db"));
    let repo = Repository::init(&config).await?;
    Ok((repo, temp_dir))
}

/// Helper to create an engine over a fresh SQLite database
pub async fn test_engine() -> Result<(TransferEngine<Repository>, TempDir)> {
    let (repo, temp_dir) = test_repository().await?;
    Ok((TransferEngine::new(repo), temp_dir))
}

/// A service with its task queue. Keep `tasks` alive: hooks fail once the
/// receiving side is gone.
pub struct TestBank {
    pub service: BankService,
    pub tasks: TaskReceiver,
    _temp: TempDir,
}

pub async fn test_bank() -> Result<TestBank> {
    let temp_dir = TempDir::new()?;
    let config = StoreConfig::new(temp_dir.path().join("test.db"));
    let (distributor, tasks) = task_queue(128);
    let service = BankService::init(&config, Arc::new(distributor)).await?;
    Ok(TestBank {
        service,
        tasks,
        _temp: temp_dir,
    })
}

pub async fn create_user<L: Ledger>(engine: &TransferEngine<L>, username: &str) -> Result<User> {
    let user = engine
        .create_user_tx(
            CreateUserParams {
                username: username.to_string(),
                full_name: format!("{} Example", username),
                email: format!("{}@example.com", username),
            },
            &NoopHook,
        )
        .await?;
    Ok(user)
}

/// Create a user (if needed) and a funded account in one go.
pub async fn funded_account<L: Ledger>(
    engine: &TransferEngine<L>,
    owner: &str,
    currency: Currency,
    balance: Cents,
) -> Result<Account> {
    match create_user(engine, owner).await {
        Ok(_) => {}
        Err(e) => match e.downcast_ref::<LedgerError>() {
            Some(LedgerError::ConstraintViolation(_)) => {}
            _ => return Err(e),
        },
    }

    let account = engine
        .create_account_tx(
            CreateAccountParams {
                owner: owner.to_string(),
                currency,
            },
            &NoopHook,
        )
        .await?;

    if balance == 0 {
        return Ok(account);
    }

    let account = engine
        .add_account_balance_tx(
            AddAccountBalanceParams {
                account_id: account.id,
                amount: balance,
            },
            &NoopHook,
        )
        .await?;
    Ok(account)
}

// ========================
// In-memory recording ledger
// ========================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateTransfer { from: AccountId, to: AccountId, amount: Cents },
    CreateEntry { account_id: AccountId, amount: Cents },
    AddBalance { account_id: AccountId, amount: Cents },
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Default)]
pub struct State {
    pub users: BTreeMap<String, User>,
    pub accounts: BTreeMap<AccountId, Account>,
    pub entries: Vec<Entry>,
    pub transfers: Vec<Transfer>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Ledger double that serialises units of work behind one lock, stages
/// writes until commit and records every call in order.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<tokio::sync::Mutex<State>>,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_on_adjust: Arc<AtomicBool>,
}

impl MemoryLedger {
    /// Ledger pre-populated with accounts `(id, owner, balance)` in USD.
    pub fn with_accounts(accounts: &[(AccountId, &str, Cents)]) -> Self {
        let mut state = State::default();
        for &(id, owner, balance) in accounts {
            state.users.entry(owner.to_string()).or_insert_with(|| User {
                username: owner.to_string(),
                full_name: owner.to_string(),
                email: format!("{}@example.com", owner),
                created_at: Utc::now(),
            });
            state.accounts.insert(
                id,
                Account {
                    id,
                    owner: owner.to_string(),
                    balance,
                    currency: Currency::Usd,
                    created_at: Utc::now(),
                },
            );
            state.next_id = state.next_id.max(id);
        }

        Self {
            state: Arc::new(tokio::sync::Mutex::new(state)),
            ..Self::default()
        }
    }

    /// Make every balance adjustment fail, simulating a lost connection
    /// after the transfer and its entries have been written.
    pub fn fail_balance_adjustments(&self) {
        self.fail_on_adjust.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Account ids in the order their balances were adjusted.
    pub fn adjustment_order(&self) -> Vec<AccountId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AddBalance { account_id, .. } => Some(account_id),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub async fn snapshot(&self) -> State {
        let state = self.state.lock().await;
        (*state).clone()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: State,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_on_adjust: bool,
}

impl MemoryTx {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn account_exists(&self, id: AccountId) -> Result<(), LedgerError> {
        if self.staged.accounts.contains_key(&id) {
            Ok(())
        } else {
            Err(LedgerError::ConstraintViolation(format!(
                "FOREIGN KEY constraint failed: account {}",
                id
            )))
        }
    }
}

#[async_trait]
impl Queries for MemoryTx {
    async fn create_user(&mut self, params: &CreateUserParams) -> Result<User, LedgerError> {
        if self.staged.users.contains_key(&params.username) {
            return Err(LedgerError::ConstraintViolation(
                "UNIQUE constraint failed: users.username".into(),
            ));
        }
        let user = User {
            username: params.username.clone(),
            full_name: params.full_name.clone(),
            email: params.email.clone(),
            created_at: Utc::now(),
        };
        self.staged.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&mut self, username: &str) -> Result<User, LedgerError> {
        self.staged
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", username)))
    }

    async fn create_account(
        &mut self,
        params: &CreateAccountParams,
    ) -> Result<Account, LedgerError> {
        if !self.staged.users.contains_key(&params.owner) {
            return Err(LedgerError::NotFound(format!("user {}", params.owner)));
        }
        if self
            .staged
            .accounts
            .values()
            .any(|a| a.owner == params.owner && a.currency == params.currency)
        {
            return Err(LedgerError::ConstraintViolation(
                "UNIQUE constraint failed: accounts.owner, accounts.currency".into(),
            ));
        }
        let account = Account {
            id: self.staged.next_id(),
            owner: params.owner.clone(),
            balance: 0,
            currency: params.currency,
            created_at: Utc::now(),
        };
        self.staged.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        self.staged
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))
    }

    async fn add_account_balance(
        &mut self,
        id: AccountId,
        amount: Cents,
    ) -> Result<Account, LedgerError> {
        self.record(Call::AddBalance {
            account_id: id,
            amount,
        });
        if self.fail_on_adjust {
            return Err(LedgerError::Storage(anyhow::anyhow!("connection reset")));
        }
        let account = self
            .staged
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))?;
        account.balance += amount;
        Ok(account.clone())
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: Cents,
    ) -> Result<Entry, LedgerError> {
        self.record(Call::CreateEntry { account_id, amount });
        self.account_exists(account_id)?;
        let entry = Entry {
            id: self.staged.next_id(),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.staged.entries.push(entry.clone());
        Ok(entry)
    }

    async fn create_transfer(
        &mut self,
        request: &TransferRequest,
    ) -> Result<Transfer, LedgerError> {
        self.record(Call::CreateTransfer {
            from: request.from_account_id,
            to: request.to_account_id,
            amount: request.amount,
        });
        self.account_exists(request.from_account_id)?;
        self.account_exists(request.to_account_id)?;
        let transfer = Transfer {
            id: self.staged.next_id(),
            from_account_id: request.from_account_id,
            to_account_id: request.to_account_id,
            amount: request.amount,
            created_at: Utc::now(),
        };
        self.staged.transfers.push(transfer.clone());
        Ok(transfer)
    }
}

#[async_trait]
impl UnitOfWork for MemoryTx {
    async fn commit(self) -> Result<(), LedgerError> {
        self.record(Call::Commit);
        let MemoryTx {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.record(Call::Rollback);
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, LedgerError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(MemoryTx {
            guard,
            staged,
            calls: self.calls.clone(),
            fail_on_adjust: self.fail_on_adjust.load(Ordering::SeqCst),
        })
    }
}
