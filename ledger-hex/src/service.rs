//! Ledger Application Service
//!
//! Orchestrates domain operations through the repository port and performs
//! the caller-side duties of a transfer (existence and currency checks).
//! Contains NO infrastructure logic - pure business orchestration.

use std::time::Duration;

use ledger_types::{
    Account, AccountId, AppError, CreateAccountParams, CreateAccountRequest, DomainError, Entry,
    LedgerStore, ListAccountsQuery, Page, Transfer, TransferFilter, TransferId, TransferParams,
    TransferRequest, TransferResult,
};

use crate::transfer::TransferEngine;

/// Application service for ledger operations.
///
/// Generic over `S: LedgerStore` - the adapter is injected at compile time.
pub struct LedgerService<S: LedgerStore> {
    engine: TransferEngine<S>,
}

impl<S: LedgerStore> LedgerService<S> {
    /// Creates a new ledger service with the default transfer deadline.
    pub fn new(store: S) -> Self {
        Self {
            engine: TransferEngine::new(store),
        }
    }

    /// Creates a new ledger service with a custom transfer deadline.
    pub fn with_transfer_timeout(store: S, timeout: Duration) -> Self {
        Self {
            engine: TransferEngine::new(store).with_timeout(timeout),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        &self.engine
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens a new account with a zero balance.
    pub async fn create_account(&self, req: CreateAccountRequest) -> Result<Account, AppError> {
        self.open_account(req.into()).await
    }

    /// Opens a new account with an explicit opening balance.
    pub async fn open_account(&self, params: CreateAccountParams) -> Result<Account, AppError> {
        params.validate()?;
        self.store().create_account(params).await.map_err(Into::into)
    }

    /// Gets an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.store()
            .get_account(id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound(format!("Account {}", id)))
    }

    /// Lists one page of accounts, optionally filtered by owner.
    pub async fn list_accounts(&self, query: ListAccountsQuery) -> Result<Vec<Account>, AppError> {
        let params = query.into_params()?;
        self.store().list_accounts(params).await.map_err(Into::into)
    }

    /// Deletes an account that has no entries or transfers.
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AppError> {
        if self.store().delete_account(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Account {}", id)))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Transfers
    // ─────────────────────────────────────────────────────────────────────────────

    /// Transfers money between accounts held in the requested currency.
    pub async fn transfer(&self, req: TransferRequest) -> Result<TransferResult, AppError> {
        let params = TransferParams::from(&req);
        params.validate()?;

        for id in [req.from_account_id, req.to_account_id] {
            let account = self.get_account(id).await?;
            if account.currency != req.currency {
                return Err(DomainError::CurrencyMismatch {
                    account_id: id,
                    expected: req.currency,
                    got: account.currency,
                }
                .into());
            }
        }

        self.engine.transfer(params).await.map_err(Into::into)
    }

    /// Gets a transfer by ID.
    pub async fn get_transfer(&self, id: TransferId) -> Result<Transfer, AppError> {
        self.store()
            .get_transfer(id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound(format!("Transfer {}", id)))
    }

    /// Lists transfers leaving or entering the given accounts.
    pub async fn list_transfers(
        &self,
        filter: TransferFilter,
        page: Page,
    ) -> Result<Vec<Transfer>, AppError> {
        self.store()
            .list_transfers(filter, page)
            .await
            .map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Entry History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists entries for an account.
    pub async fn list_entries(&self, account_id: AccountId, page: Page) -> Result<Vec<Entry>, AppError> {
        // Verify account exists first
        let _ = self.get_account(account_id).await?;

        self.store()
            .list_entries(account_id, page)
            .await
            .map_err(Into::into)
    }
}
