use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{BankService, Page, TransferPolicy};
use crate::config::{LogConfig, StoreConfig};
use crate::domain::{AccountId, TransferId, format_cents, parse_cents};
use crate::logging::init_logging;
use crate::notify::{TaskProcessor, task_queue};

/// bankcore - transactional money transfers between bank accounts
#[derive(Parser)]
#[command(name = "bankcore")]
#[command(about = "Accounts, deposits and atomic transfers over a SQLite ledger")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreConfig,

    #[command(flatten)]
    pub log: LogConfig,

    /// Allow transfers and withdrawals to take a balance below zero
    #[arg(long, global = true)]
    pub allow_overdraft: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Add money to an account
    Deposit {
        /// Account ID
        account: AccountId,

        /// Amount to add (e.g., "50.00" or "50")
        amount: String,
    },

    /// Transfer money between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account ID
        #[arg(long)]
        from: AccountId,

        /// Destination account ID
        #[arg(long)]
        to: AccountId,

        /// Currency both accounts must hold
        #[arg(short, long, default_value = "USD")]
        currency: String,
    },

    /// List an account's ledger entries
    Entries {
        /// Account ID
        account: AccountId,

        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 10)]
        page_size: i64,
    },

    /// List transfers, optionally for one account
    Transfers {
        /// Filter by account ID
        #[arg(long)]
        account: Option<AccountId>,

        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 10)]
        page_size: i64,
    },

    /// Show one transfer
    #[command(name = "show")]
    ShowTransfer {
        /// Transfer ID
        id: TransferId,
    },

    /// Export an account statement or transfers to CSV
    Export {
        /// What to export: statement, transfers
        export_type: String,

        /// Account ID (required for statement)
        #[arg(long)]
        account: Option<AccountId>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Username (must be unique)
        username: String,

        /// Full name
        #[arg(long)]
        full_name: String,

        /// Email address (must be unique)
        #[arg(long)]
        email: String,
    },

    /// Show a user and their accounts
    Show {
        /// Username
        username: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open an account with a zero balance
    Create {
        /// Owning username
        owner: String,

        /// Currency code: USD, EUR, GBP, BDT
        #[arg(short, long, default_value = "USD")]
        currency: String,
    },

    /// Show one account
    Show {
        /// Account ID
        id: AccountId,
    },

    /// List accounts
    List {
        /// Only accounts of this owner
        #[arg(long)]
        owner: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 10)]
        page_size: i64,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_logging(&self.log);

        let (distributor, receiver) = task_queue(64);
        let worker = tokio::spawn(TaskProcessor::new(receiver).run());

        let policy = TransferPolicy {
            allow_overdraft: self.allow_overdraft,
        };
        let service = match self.command {
            Commands::Init => BankService::init(&self.store, Arc::new(distributor)).await?,
            _ => BankService::connect(&self.store, Arc::new(distributor))
                .await
                .context("Database not initialized? Run `bankcore init` first")?,
        }
        .with_policy(policy);

        let outcome = run_command(&service, &self.store, self.command).await;

        // Closing the last distributor lets the worker drain and stop.
        drop(service);
        worker.await.context("Task processor panicked")?;

        outcome
    }
}

async fn run_command(service: &BankService, store: &StoreConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            println!("Database initialized: {}", store.database.display());
        }

        Commands::User(cmd) => run_user_command(service, cmd).await?,

        Commands::Account(cmd) => run_account_command(service, cmd).await?,

        Commands::Deposit { account, amount } => {
            let amount =
                parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let account = service.deposit(account, amount).await?;
            println!(
                "Deposited {} into account {}; balance {} {}",
                format_cents(amount),
                account.id,
                format_cents(account.balance),
                account.currency
            );
        }

        Commands::Transfer {
            amount,
            from,
            to,
            currency,
        } => {
            let amount =
                parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let result = service.transfer(from, to, amount, &currency).await?;

            println!(
                "Transfer {}: {} {} from account {} to account {}",
                result.transfer.id,
                format_cents(result.transfer.amount),
                result.from_account.currency,
                result.from_account.id,
                result.to_account.id
            );
            println!(
                "  account {} balance: {}",
                result.from_account.id,
                format_cents(result.from_account.balance)
            );
            println!(
                "  account {} balance: {}",
                result.to_account.id,
                format_cents(result.to_account.balance)
            );
        }

        Commands::Entries {
            account,
            page,
            page_size,
        } => {
            let entries = service
                .list_entries(account, Page::new(page, page_size)?)
                .await?;
            if entries.is_empty() {
                println!("No entries found.");
            } else {
                println!("{:<8} {:>14}  {}", "ID", "AMOUNT", "CREATED");
                println!("{}", "-".repeat(50));
                for entry in entries {
                    println!(
                        "{:<8} {:>14}  {}",
                        entry.id,
                        format_cents(entry.amount),
                        entry.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }

        Commands::Transfers {
            account,
            page,
            page_size,
        } => {
            let transfers = service
                .list_transfers(account, Page::new(page, page_size)?)
                .await?;
            if transfers.is_empty() {
                println!("No transfers found.");
            } else {
                println!(
                    "{:<8} {:>8} {:>8} {:>14}  {}",
                    "ID", "FROM", "TO", "AMOUNT", "CREATED"
                );
                println!("{}", "-".repeat(66));
                for transfer in transfers {
                    println!(
                        "{:<8} {:>8} {:>8} {:>14}  {}",
                        transfer.id,
                        transfer.from_account_id,
                        transfer.to_account_id,
                        format_cents(transfer.amount),
                        transfer.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }

        Commands::ShowTransfer { id } => {
            let transfer = service.get_transfer(id).await?;
            println!("Transfer: {}", transfer.id);
            println!("  From:    account {}", transfer.from_account_id);
            println!("  To:      account {}", transfer.to_account_id);
            println!("  Amount:  {}", format_cents(transfer.amount));
            println!(
                "  Created: {}",
                transfer.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        Commands::Export {
            export_type,
            account,
            output,
        } => run_export_command(service, &export_type, account, output.as_deref()).await?,
    }

    Ok(())
}

async fn run_user_command(service: &BankService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Create {
            username,
            full_name,
            email,
        } => {
            let user = service.create_user(username, full_name, email).await?;
            println!("Created user: {} <{}>", user.username, user.email);
        }

        UserCommands::Show { username } => {
            let user = service.get_user(&username).await?;
            let accounts = service
                .list_accounts(Some(&username), Page::new(1, Page::MAX_SIZE)?)
                .await?;

            println!("User: {}", user.username);
            println!("  Name:    {}", user.full_name);
            println!("  Email:   {}", user.email);
            println!(
                "  Created: {}",
                user.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            for account in accounts {
                println!(
                    "  Account {}: {} {}",
                    account.id,
                    format_cents(account.balance),
                    account.currency
                );
            }
        }
    }
    Ok(())
}

async fn run_account_command(service: &BankService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create { owner, currency } => {
            let account = service.create_account(&owner, &currency).await?;
            println!(
                "Created account {} for {} ({})",
                account.id, account.owner, account.currency
            );
        }

        AccountCommands::Show { id } => {
            let account = service.get_account(id).await?;
            println!("Account: {}", account.id);
            println!("  Owner:    {}", account.owner);
            println!("  Currency: {}", account.currency);
            println!("  Balance:  {}", format_cents(account.balance));
            println!(
                "  Created:  {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        AccountCommands::List {
            owner,
            page,
            page_size,
        } => {
            let accounts = service
                .list_accounts(owner.as_deref(), Page::new(page, page_size)?)
                .await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<8} {:<20} {:<8} {:>14}", "ID", "OWNER", "CURRENCY", "BALANCE");
                println!("{}", "-".repeat(53));
                for account in accounts {
                    println!(
                        "{:<8} {:<20} {:<8} {:>14}",
                        account.id,
                        account.owner,
                        account.currency.as_str(),
                        format_cents(account.balance)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &BankService,
    export_type: &str,
    account: Option<AccountId>,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match export_type {
        "statement" => {
            let account = account.context("--account is required for a statement export")?;
            exporter.export_statement_csv(account, writer).await?
        }
        "transfers" => exporter.export_transfers_csv(account, writer).await?,
        other => anyhow::bail!(
            "Unknown export type '{}'. Valid types: statement, transfers",
            other
        ),
    };

    if let Some(path) = output {
        eprintln!("Exported {} records to {}", count, path);
    }
    Ok(())
}
