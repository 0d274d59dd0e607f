mod common;

use anyhow::Result;
use bankcore::application::{NoopHook, TransferEngine};
use bankcore::domain::{Account, AddAccountBalanceParams, CreateAccountParams, Currency, TransferRequest};
use bankcore::storage::LedgerError;
use common::{Call, MemoryLedger};

#[tokio::test]
async fn test_lower_account_id_is_adjusted_first_in_both_directions() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(5, "alice", 1000), (9, "bob", 1000)]);
    let engine = TransferEngine::new(ledger.clone());

    engine.transfer_tx(TransferRequest::new(9, 5, 100)).await?;
    assert_eq!(ledger.adjustment_order(), vec![5, 9]);

    ledger.clear_calls();
    engine.transfer_tx(TransferRequest::new(5, 9, 100)).await?;
    assert_eq!(ledger.adjustment_order(), vec![5, 9]);

    Ok(())
}

#[tokio::test]
async fn test_transfer_records_then_adjusts() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(5, "alice", 1000), (9, "bob", 1000)]);
    let engine = TransferEngine::new(ledger.clone());

    engine.transfer_tx(TransferRequest::new(9, 5, 250)).await?;

    assert_eq!(
        ledger.calls(),
        vec![
            Call::CreateTransfer {
                from: 9,
                to: 5,
                amount: 250
            },
            Call::CreateEntry {
                account_id: 9,
                amount: -250
            },
            Call::CreateEntry {
                account_id: 5,
                amount: 250
            },
            Call::AddBalance {
                account_id: 5,
                amount: 250
            },
            Call::AddBalance {
                account_id: 9,
                amount: -250
            },
            Call::Commit,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_adjustment_leaves_nothing_behind() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(1, "alice", 100), (2, "bob", 50)]);
    let engine = TransferEngine::new(ledger.clone());
    let before = ledger.snapshot().await;

    ledger.fail_balance_adjustments();
    let err = engine
        .transfer_tx(TransferRequest::new(1, 2, 30))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));

    // The transfer and both entries were written inside the unit of work...
    let calls = ledger.calls();
    assert!(matches!(calls[0], Call::CreateTransfer { .. }));
    assert!(matches!(calls[2], Call::CreateEntry { .. }));
    assert_eq!(calls.last(), Some(&Call::Rollback));

    // ...but none of it survived the rollback.
    let after = ledger.snapshot().await;
    assert!(after.transfers.is_empty());
    assert!(after.entries.is_empty());
    assert_eq!(after.accounts, before.accounts);
    Ok(())
}

#[tokio::test]
async fn test_result_reflects_post_update_state() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(3, "alice", 500), (8, "bob", 0)]);
    let engine = TransferEngine::new(ledger.clone());

    let result = engine.transfer_tx(TransferRequest::new(8, 3, 0)).await;
    assert!(matches!(result, Err(LedgerError::InvalidAmount(0))));
    assert!(ledger.calls().is_empty(), "nothing may be written");

    let result = engine.transfer_tx(TransferRequest::new(3, 8, 120)).await?;
    assert_eq!(result.from_account.id, 3);
    assert_eq!(result.from_account.balance, 380);
    assert_eq!(result.to_account.id, 8);
    assert_eq!(result.to_account.balance, 120);
    assert_eq!(result.from_entry.amount, -120);
    assert_eq!(result.to_entry.amount, 120);

    let state = ledger.snapshot().await;
    assert_eq!(state.accounts[&3].balance, 380);
    assert_eq!(state.accounts[&8].balance, 120);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_rolls_back_after_adjusting() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(1, "alice", 10), (2, "bob", 0)]);
    let engine = TransferEngine::new(ledger.clone());

    let err = engine
        .transfer_tx(TransferRequest::new(1, 2, 11))
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientFunds {
            account_id,
            balance,
            required,
        } => {
            assert_eq!(account_id, 1);
            assert_eq!(balance, 10);
            assert_eq!(required, 11);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The check runs under the lock, after both adjustments were issued.
    assert_eq!(ledger.adjustment_order(), vec![1, 2]);
    let state = ledger.snapshot().await;
    assert_eq!(state.accounts[&1].balance, 10);
    assert!(state.transfers.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_hook_failure_discards_account() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(1, "alice", 0)]);
    let engine = TransferEngine::new(ledger.clone());

    let hook = |_: &Account| -> anyhow::Result<()> { anyhow::bail!("queue unavailable") };
    let err = engine
        .create_account_tx(
            CreateAccountParams {
                owner: "alice".into(),
                currency: Currency::Eur,
            },
            &hook,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Hook(_)));
    assert_eq!(ledger.snapshot().await.accounts.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_hook_sees_updated_account() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(4, "alice", 70)]);
    let engine = TransferEngine::new(ledger.clone());
    let seen = std::sync::Mutex::new(None);

    let hook = |account: &Account| -> anyhow::Result<()> {
        *seen.lock().unwrap() = Some(account.balance);
        Ok(())
    };
    let account = engine
        .add_account_balance_tx(
            AddAccountBalanceParams {
                account_id: 4,
                amount: 30,
            },
            &hook,
        )
        .await?;

    assert_eq!(account.balance, 100);
    assert_eq!(*seen.lock().unwrap(), Some(100));

    let err = engine
        .add_account_balance_tx(
            AddAccountBalanceParams {
                account_id: 77,
                amount: 30,
            },
            &NoopHook,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_self_transfer_skips_balance_floor() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(3, "alice", -50)]);
    let engine = TransferEngine::new(ledger.clone());

    let result = engine.transfer_tx(TransferRequest::new(3, 3, 10)).await?;
    assert_eq!(result.from_account.balance, -50);
    assert_eq!(result.to_account.balance, -50);
    assert_eq!(ledger.adjustment_order(), vec![3, 3]);
    assert_eq!(ledger.calls().last(), Some(&Call::Commit));
    Ok(())
}

#[tokio::test]
async fn test_create_account_for_unknown_owner() -> Result<()> {
    let ledger = MemoryLedger::with_accounts(&[(1, "alice", 0)]);
    let engine = TransferEngine::new(ledger.clone());

    let err = engine
        .create_account_tx(
            CreateAccountParams {
                owner: "ghost".into(),
                currency: Currency::Usd,
            },
            &NoopHook,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    assert_eq!(ledger.snapshot().await.accounts.len(), 1);
    Ok(())
}
