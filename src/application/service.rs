use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::domain::{
    Account, AccountId, AddAccountBalanceParams, Cents, CreateAccountParams, CreateUserParams,
    Currency, Entry, Transfer, TransferId, TransferRequest, TransferResult, User,
};
use crate::notify::{Task, TaskDistributor, TaskOptions};
use crate::storage::{LedgerError, Repository};

use super::{AfterCreate, AppError, TransferEngine, TransferPolicy};

/// Page of a listing. `page_id` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page_id: i64,
    pub page_size: i64,
}

impl Page {
    pub const MAX_SIZE: i64 = 100;

    pub fn new(page_id: i64, page_size: i64) -> Result<Self, AppError> {
        if page_id < 1 || !(1..=Self::MAX_SIZE).contains(&page_size) {
            return Err(AppError::InvalidPage { page_id, page_size });
        }
        Ok(Self { page_id, page_size })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page_id - 1) * self.page_size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page_id: 1,
            page_size: 10,
        }
    }
}

/// Application service in front of the transfer engine.
///
/// Performs the request-level checks the engine leaves to its caller
/// (positive amounts, supported and matching currencies, distinct accounts)
/// and wires the notification hooks into the account workflows.
pub struct BankService {
    engine: TransferEngine<Repository>,
    distributor: Arc<dyn TaskDistributor>,
}

impl BankService {
    pub fn new(repo: Repository, distributor: Arc<dyn TaskDistributor>) -> Self {
        Self {
            engine: TransferEngine::new(repo),
            distributor,
        }
    }

    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.engine = self.engine.with_policy(policy);
        self
    }

    /// Create (if needed) and migrate the database, then build the service.
    pub async fn init(
        config: &StoreConfig,
        distributor: Arc<dyn TaskDistributor>,
    ) -> Result<Self, AppError> {
        let repo = Repository::init(config).await?;
        Ok(Self::new(repo, distributor))
    }

    /// Connect to an existing database.
    pub async fn connect(
        config: &StoreConfig,
        distributor: Arc<dyn TaskDistributor>,
    ) -> Result<Self, AppError> {
        let repo = Repository::connect(config, false).await?;
        Ok(Self::new(repo, distributor))
    }

    pub fn engine(&self) -> &TransferEngine<Repository> {
        &self.engine
    }

    pub fn repository(&self) -> &Repository {
        self.engine.ledger()
    }

    // ========================
    // Users
    // ========================

    /// Register a user and queue the verification email.
    pub async fn create_user(
        &self,
        username: String,
        full_name: String,
        email: String,
    ) -> Result<User, AppError> {
        let params = CreateUserParams {
            username,
            full_name,
            email,
        };
        let hook = VerifyEmailHook(self.distributor.clone());

        match self.engine.create_user_tx(params.clone(), &hook).await {
            Ok(user) => Ok(user),
            Err(LedgerError::ConstraintViolation(_)) => {
                Err(AppError::UserAlreadyExists(params.username))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user(&self, username: &str) -> Result<User, AppError> {
        self.repository()
            .get_user(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    // ========================
    // Accounts
    // ========================

    /// Open an account for `owner` and queue the "account created" email.
    pub async fn create_account(&self, owner: &str, currency: &str) -> Result<Account, AppError> {
        let currency: Currency = currency.parse()?;
        let params = CreateAccountParams {
            owner: owner.to_string(),
            currency,
        };
        let hook = AccountCreatedHook(self.distributor.clone());

        match self.engine.create_account_tx(params, &hook).await {
            Ok(account) => Ok(account),
            Err(LedgerError::NotFound(_)) => Err(AppError::UserNotFound(owner.to_string())),
            Err(LedgerError::ConstraintViolation(_)) => Err(AppError::AccountAlreadyExists {
                owner: owner.to_string(),
                currency,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repository()
            .get_account(id)
            .await?
            .ok_or(AppError::AccountNotFound(id))
    }

    pub async fn list_accounts(
        &self,
        owner: Option<&str>,
        page: Page,
    ) -> Result<Vec<Account>, AppError> {
        Ok(self
            .repository()
            .list_accounts(owner, page.limit(), page.offset())
            .await?)
    }

    /// Add money to an account and queue the "balance added" email.
    pub async fn deposit(&self, account_id: AccountId, amount: Cents) -> Result<Account, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(amount));
        }

        let params = AddAccountBalanceParams { account_id, amount };
        let hook = BalanceAddedHook {
            distributor: self.distributor.clone(),
            added: amount,
        };

        match self.engine.add_account_balance_tx(params, &hook).await {
            Ok(account) => Ok(account),
            Err(LedgerError::NotFound(_)) => Err(AppError::AccountNotFound(account_id)),
            Err(e) => Err(e.into()),
        }
    }

    // ========================
    // Transfers
    // ========================

    /// Transfer money between two accounts of the given currency.
    pub async fn transfer(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Cents,
        currency: &str,
    ) -> Result<TransferResult, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(amount));
        }
        if from_account_id == to_account_id {
            return Err(AppError::SameAccount(from_account_id));
        }
        let currency: Currency = currency.parse()?;

        self.valid_account(from_account_id, currency).await?;
        self.valid_account(to_account_id, currency).await?;

        let request = TransferRequest::new(from_account_id, to_account_id, amount);
        Ok(self.engine.transfer_tx(request).await?)
    }

    async fn valid_account(&self, id: AccountId, currency: Currency) -> Result<Account, AppError> {
        let account = self.get_account(id).await?;
        if account.currency != currency {
            return Err(AppError::CurrencyMismatch {
                account_id: id,
                actual: account.currency,
                expected: currency,
            });
        }
        Ok(account)
    }

    pub async fn get_transfer(&self, id: TransferId) -> Result<Transfer, AppError> {
        self.repository()
            .get_transfer(id)
            .await?
            .ok_or(AppError::TransferNotFound(id))
    }

    /// Transfers touching an account, or all transfers.
    pub async fn list_transfers(
        &self,
        account_id: Option<AccountId>,
        page: Page,
    ) -> Result<Vec<Transfer>, AppError> {
        if let Some(id) = account_id {
            self.get_account(id).await?;
        }
        Ok(self
            .repository()
            .list_transfers(account_id, page.limit(), page.offset())
            .await?)
    }

    pub async fn list_entries(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Entry>, AppError> {
        self.get_account(account_id).await?;
        Ok(self
            .repository()
            .list_entries(account_id, page.limit(), page.offset())
            .await?)
    }
}

struct VerifyEmailHook(Arc<dyn TaskDistributor>);

#[async_trait]
impl AfterCreate<User> for VerifyEmailHook {
    async fn after_create(&self, user: &User) -> anyhow::Result<()> {
        self.0
            .distribute_task(Task::verify_email(user), TaskOptions::critical())
            .await
    }
}

struct AccountCreatedHook(Arc<dyn TaskDistributor>);

#[async_trait]
impl AfterCreate<Account> for AccountCreatedHook {
    async fn after_create(&self, account: &Account) -> anyhow::Result<()> {
        self.0
            .distribute_task(Task::account_created(account), TaskOptions::critical())
            .await
    }
}

struct BalanceAddedHook {
    distributor: Arc<dyn TaskDistributor>,
    added: Cents,
}

#[async_trait]
impl AfterCreate<Account> for BalanceAddedHook {
    async fn after_create(&self, account: &Account) -> anyhow::Result<()> {
        self.distributor
            .distribute_task(
                Task::balance_added(account, self.added),
                TaskOptions::critical(),
            )
            .await
    }
}
