//! Repository port traits.
//!
//! The transfer orchestrator never touches a connection directly. It opens a
//! [`LedgerTx`] through [`LedgerStore::begin`] and drives the capability
//! traits bound to that transaction. Adapters (Postgres, SQLite, in-memory)
//! implement these traits.

use crate::domain::{Account, AccountId, Entry, EntryId, Transfer, TransferId};
use crate::dto::{CreateAccountParams, ListAccountsParams, Page, TransferFilter};
use crate::error::RepoError;

/// Account reads inside a transaction.
#[async_trait::async_trait]
pub trait AccountReader: Send {
    /// Plain read, no locking.
    ///
    /// Fails with `DomainError::AccountNotFound` when the account is missing.
    async fn get_account(&mut self, id: AccountId) -> Result<Account, RepoError>;

    /// Read that takes an exclusive row lock held until the transaction ends.
    ///
    /// Blocks while another transaction holds the lock. Acquiring a lock the
    /// transaction already holds must not block.
    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, RepoError>;
}

/// Balance mutation inside a transaction.
#[async_trait::async_trait]
pub trait AccountWriter: Send {
    /// Atomically adds `delta` to the balance and returns the updated account.
    ///
    /// Only valid while the transaction holds the account's row lock.
    async fn add_account_balance(&mut self, id: AccountId, delta: i64)
    -> Result<Account, RepoError>;
}

/// Append-only entry log.
#[async_trait::async_trait]
pub trait EntryWriter: Send {
    async fn create_entry(&mut self, account_id: AccountId, amount: i64)
    -> Result<Entry, RepoError>;
}

/// Write-once transfer records.
#[async_trait::async_trait]
pub trait TransferWriter: Send {
    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, RepoError>;
}

/// One open storage transaction.
///
/// Dropping a transaction without committing rolls it back and releases every
/// lock it holds.
#[async_trait::async_trait]
pub trait LedgerTx: AccountReader + AccountWriter + EntryWriter + TransferWriter {
    async fn commit(self) -> Result<(), RepoError>;

    async fn rollback(self) -> Result<(), RepoError>;
}

/// Storage backend of the ledger.
///
/// Administrative operations run in their own implicit transaction; balance
/// mutations only happen through a [`LedgerTx`].
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx + 'static;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Account administration
    // ─────────────────────────────────────────────────────────────────────────────

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, RepoError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError>;

    /// Lists accounts ordered by id, optionally restricted to one owner.
    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, RepoError>;

    /// Deletes an account. Returns false when it did not exist.
    ///
    /// Accounts referenced by entries or transfers cannot be deleted.
    async fn delete_account(&self, id: AccountId) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Audit trail
    // ─────────────────────────────────────────────────────────────────────────────

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, RepoError>;

    /// Lists an account's entries ordered by id.
    async fn list_entries(&self, account_id: AccountId, page: Page)
    -> Result<Vec<Entry>, RepoError>;

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError>;

    /// Lists transfers ordered by id.
    async fn list_transfers(
        &self,
        filter: TransferFilter,
        page: Page,
    ) -> Result<Vec<Transfer>, RepoError>;
}
