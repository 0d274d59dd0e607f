use anyhow::Result;
use std::io::Write;

use crate::application::{BankService, Page};
use crate::domain::{AccountId, format_cents};

/// Writes account statements and transfer listings as CSV.
pub struct Exporter<'a> {
    service: &'a BankService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export every entry of an account, oldest first, with a running balance.
    /// Direct deposits have no entry, so the running balance starts from the
    /// entries alone.
    pub async fn export_statement_csv<W: Write>(
        &self,
        account_id: AccountId,
        writer: W,
    ) -> Result<usize> {
        let account = self.service.get_account(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "entry_id",
            "account_id",
            "amount",
            "running_total",
            "currency",
            "created_at",
        ])?;

        let mut count = 0;
        let mut running = 0i64;
        let mut page_id = 1;
        loop {
            let page = Page::new(page_id, Page::MAX_SIZE)?;
            let entries = self.service.list_entries(account_id, page).await?;
            let fetched = entries.len();

            for entry in entries {
                running += entry.amount;
                csv_writer.write_record([
                    entry.id.to_string(),
                    entry.account_id.to_string(),
                    format_cents(entry.amount),
                    format_cents(running),
                    account.currency.to_string(),
                    entry.created_at.to_rfc3339(),
                ])?;
                count += 1;
            }

            if fetched < Page::MAX_SIZE as usize {
                break;
            }
            page_id += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export transfers touching an account (or all transfers) to CSV.
    pub async fn export_transfers_csv<W: Write>(
        &self,
        account_id: Option<AccountId>,
        writer: W,
    ) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "transfer_id",
            "from_account_id",
            "to_account_id",
            "amount",
            "created_at",
        ])?;

        let mut count = 0;
        let mut page_id = 1;
        loop {
            let page = Page::new(page_id, Page::MAX_SIZE)?;
            let transfers = self.service.list_transfers(account_id, page).await?;
            let fetched = transfers.len();

            for transfer in transfers {
                csv_writer.write_record([
                    transfer.id.to_string(),
                    transfer.from_account_id.to_string(),
                    transfer.to_account_id.to_string(),
                    format_cents(transfer.amount),
                    transfer.created_at.to_rfc3339(),
                ])?;
                count += 1;
            }

            if fetched < Page::MAX_SIZE as usize {
                break;
            }
            page_id += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }
}
