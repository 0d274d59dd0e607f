use async_trait::async_trait;

use crate::domain::{
    Account, AccountId, Cents, CreateAccountParams, CreateUserParams, Entry, Transfer,
    TransferRequest, User,
};

use super::LedgerError;

/// Point operations available inside an open unit of work.
///
/// Every write made through these methods becomes visible to other units of
/// work only after [`UnitOfWork::commit`].
#[async_trait]
pub trait Queries: Send {
    async fn create_user(&mut self, params: &CreateUserParams) -> Result<User, LedgerError>;

    async fn get_user(&mut self, username: &str) -> Result<User, LedgerError>;

    /// Insert an account with a zero balance. A missing owner is `NotFound`.
    async fn create_account(&mut self, params: &CreateAccountParams)
    -> Result<Account, LedgerError>;

    async fn get_account(&mut self, id: AccountId) -> Result<Account, LedgerError>;

    /// Add a signed delta to an account balance and return the updated row.
    /// Takes the account's write lock, held until the unit of work ends.
    async fn add_account_balance(
        &mut self,
        id: AccountId,
        amount: Cents,
    ) -> Result<Account, LedgerError>;

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: Cents,
    ) -> Result<Entry, LedgerError>;

    async fn create_transfer(&mut self, request: &TransferRequest)
    -> Result<Transfer, LedgerError>;
}

/// An all-or-nothing group of store operations.
///
/// Dropping a unit of work without committing it discards every write made
/// through it.
#[async_trait]
pub trait UnitOfWork: Queries + Sized {
    async fn commit(self) -> Result<(), LedgerError>;

    async fn rollback(self) -> Result<(), LedgerError>;
}

/// A backing store able to open units of work.
#[async_trait]
pub trait Ledger: Send + Sync {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, LedgerError>;
}
