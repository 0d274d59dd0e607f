use tracing::{debug, info, warn};

use crate::domain::{
    Account, AddAccountBalanceParams, Cents, CreateAccountParams, CreateUserParams, TransferRequest,
    TransferResult, User,
};
use crate::storage::{Ledger, LedgerError, Queries, UnitOfWork};

use super::hooks::AfterCreate;

/// Balance rules applied inside the unit of work, under the account's write lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Let debits take an account below zero.
    pub allow_overdraft: bool,
}

/// Runs transfers and account workflows as atomic units of work against a [`Ledger`].
///
/// The engine never retries: a failed step rolls back and the error is
/// returned to the caller unchanged.
#[derive(Debug, Clone)]
pub struct TransferEngine<L> {
    ledger: L,
    policy: TransferPolicy,
}

impl<L: Ledger> TransferEngine<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            policy: TransferPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    /// Move `amount` from one account to another.
    ///
    /// Records the transfer and its debit and credit entries, then adjusts
    /// both balances with the lower account id first.
    pub async fn transfer_tx(&self, request: TransferRequest) -> Result<TransferResult, LedgerError> {
        if request.amount <= 0 {
            return Err(LedgerError::InvalidAmount(request.amount));
        }

        let mut tx = self.ledger.begin().await?;
        let outcome = self.transfer_in(&mut tx, &request).await;
        let result = finish(tx, outcome).await?;

        info!(
            transfer_id = result.transfer.id,
            from = request.from_account_id,
            to = request.to_account_id,
            amount = request.amount,
            "transfer committed"
        );
        Ok(result)
    }

    async fn transfer_in(
        &self,
        tx: &mut L::Tx,
        request: &TransferRequest,
    ) -> Result<TransferResult, LedgerError> {
        let transfer = tx.create_transfer(request).await?;
        debug!(transfer_id = transfer.id, "transfer recorded");

        let from_entry = tx
            .create_entry(request.from_account_id, -request.amount)
            .await?;
        let to_entry = tx.create_entry(request.to_account_id, request.amount).await?;

        let [(first_id, first_delta), (second_id, second_delta)] = request.balance_adjustments();
        let first = tx.add_account_balance(first_id, first_delta).await?;
        let second = tx.add_account_balance(second_id, second_delta).await?;

        // A self-transfer nets to zero, so there is nothing to check the floor against.
        if request.from_account_id == request.to_account_id {
            return Ok(TransferResult {
                transfer,
                from_account: second.clone(),
                to_account: second,
                from_entry,
                to_entry,
            });
        }

        let (from_account, to_account) = if first.id == request.from_account_id {
            (first, second)
        } else {
            (second, first)
        };

        self.check_floor(&from_account, -request.amount)?;

        Ok(TransferResult {
            transfer,
            from_account,
            to_account,
            from_entry,
            to_entry,
        })
    }

    /// Create an account with a zero balance for an existing user, then run `hook`
    /// on it before committing.
    ///
    /// The insert is the first statement so the write lock is taken up front;
    /// a missing owner surfaces from the store as `NotFound`.
    pub async fn create_account_tx<H>(
        &self,
        params: CreateAccountParams,
        hook: &H,
    ) -> Result<Account, LedgerError>
    where
        H: AfterCreate<Account> + ?Sized,
    {
        let mut tx = self.ledger.begin().await?;
        let outcome: Result<Account, LedgerError> = async {
            let account = tx.create_account(&params).await?;
            hook.after_create(&account)
                .await
                .map_err(LedgerError::Hook)?;
            Ok(account)
        }
        .await;
        let account = finish(tx, outcome).await?;

        info!(account_id = account.id, owner = %account.owner, currency = %account.currency, "account created");
        Ok(account)
    }

    /// Apply a signed balance adjustment to one account, then run `hook` on
    /// the updated account before committing.
    pub async fn add_account_balance_tx<H>(
        &self,
        params: AddAccountBalanceParams,
        hook: &H,
    ) -> Result<Account, LedgerError>
    where
        H: AfterCreate<Account> + ?Sized,
    {
        if params.amount == 0 || params.amount == Cents::MIN {
            return Err(LedgerError::InvalidAmount(params.amount));
        }

        let mut tx = self.ledger.begin().await?;
        let outcome: Result<Account, LedgerError> = async {
            let account = tx
                .add_account_balance(params.account_id, params.amount)
                .await?;
            if params.amount < 0 {
                self.check_floor(&account, params.amount)?;
            }
            hook.after_create(&account)
                .await
                .map_err(LedgerError::Hook)?;
            Ok(account)
        }
        .await;
        let account = finish(tx, outcome).await?;

        info!(account_id = account.id, amount = params.amount, balance = account.balance, "balance adjusted");
        Ok(account)
    }

    /// Create a user, then run `hook` on it before committing.
    pub async fn create_user_tx<H>(
        &self,
        params: CreateUserParams,
        hook: &H,
    ) -> Result<User, LedgerError>
    where
        H: AfterCreate<User> + ?Sized,
    {
        let mut tx = self.ledger.begin().await?;
        let outcome: Result<User, LedgerError> = async {
            let user = tx.create_user(&params).await?;
            hook.after_create(&user).await.map_err(LedgerError::Hook)?;
            Ok(user)
        }
        .await;
        let user = finish(tx, outcome).await?;

        info!(username = %user.username, "user created");
        Ok(user)
    }

    /// Reject a debit that left `account` below zero. `delta` is the signed
    /// adjustment just applied, so the pre-debit balance is `balance - delta`.
    fn check_floor(&self, account: &Account, delta: Cents) -> Result<(), LedgerError> {
        if self.policy.allow_overdraft || account.balance >= 0 {
            return Ok(());
        }
        let (Some(balance), Some(required)) = (account.balance.checked_sub(delta), delta.checked_neg())
        else {
            return Err(LedgerError::InvalidAmount(delta));
        };
        Err(LedgerError::InsufficientFunds {
            account_id: account.id,
            balance,
            required,
        })
    }
}

/// Commit on success; on failure roll back and return the original error.
async fn finish<T, U>(tx: U, outcome: Result<T, LedgerError>) -> Result<T, LedgerError>
where
    U: UnitOfWork,
{
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            debug!(error = %err, "rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %err, rollback_error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
