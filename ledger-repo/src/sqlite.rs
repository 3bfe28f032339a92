//! SQLite repository adapter.
//!
//! SQLite has a single writer and no row locks. The adapter keeps exactly one
//! pooled connection, so a ledger transaction owns the whole database until it
//! ends and `get_account_for_update` is a plain read inside an already
//! exclusive transaction. Callers waiting for the connection time out with a
//! transient error.
#![allow(clippy::collapsible_if)]

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use ledger_types::{
    Account, AccountId, AccountReader, AccountWriter, CreateAccountParams, DomainError, Entry,
    EntryId, EntryWriter, LedgerStore, LedgerTx, ListAccountsParams, Page, RepoError, Transfer,
    TransferFilter, TransferId, TransferWriter,
};

use crate::RepoOptions;
use crate::types::{DbAccount, DbEntry, DbTransfer, db_err};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite ledger.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Creates a new SQLite ledger with automatic migration.
    pub async fn new(database_url: &str, options: &RepoOptions) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(options.lock_timeout);

        // One long-lived connection: it is the write lock, and an in-memory
        // database lives exactly as long as it does.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await?;

        let ledger = Self { pool };
        ledger.create_schema().await?;
        Ok(ledger)
    }

    /// Opens an in-memory ledger with default options.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::new("sqlite::memory:", &RepoOptions::default()).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_ledger_tables.sql");
        sqlx::query(ddl).execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction-bound capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// An open SQLite transaction. Dropping it rolls back.
pub struct SqliteLedgerTx {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteLedgerTx {
    async fn fetch_account(&mut self, id: AccountId) -> Result<Account, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, owner, balance, currency, created_at FROM accounts WHERE id = ?"#,
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;

        row.ok_or(RepoError::Domain(DomainError::AccountNotFound(id)))?
            .into_domain()
    }
}

#[async_trait]
impl AccountReader for SqliteLedgerTx {
    async fn get_account(&mut self, id: AccountId) -> Result<Account, RepoError> {
        self.fetch_account(id).await
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, RepoError> {
        // The transaction already holds the only connection.
        self.fetch_account(id).await
    }
}

#[async_trait]
impl AccountWriter for SqliteLedgerTx {
    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"UPDATE accounts SET balance = balance + ? WHERE id = ?
               RETURNING id, owner, balance, currency, created_at"#,
        )
        .bind(delta)
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;

        row.ok_or(RepoError::Domain(DomainError::AccountNotFound(id)))?
            .into_domain()
    }
}

#[async_trait]
impl EntryWriter for SqliteLedgerTx {
    async fn create_entry(&mut self, account_id: AccountId, amount: i64) -> Result<Entry, RepoError> {
        let row: DbEntry = sqlx::query_as(
            r#"INSERT INTO entries (account_id, amount, created_at) VALUES (?, ?, ?)
               RETURNING id, account_id, amount, created_at"#,
        )
        .bind(account_id.as_i64())
        .bind(amount)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;

        Ok(row.into_domain())
    }
}

#[async_trait]
impl TransferWriter for SqliteLedgerTx {
    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, RepoError> {
        let row: DbTransfer = sqlx::query_as(
            r#"INSERT INTO transfers (from_account_id, to_account_id, amount, created_at)
               VALUES (?, ?, ?, ?)
               RETURNING id, from_account_id, to_account_id, amount, created_at"#,
        )
        .bind(from_account_id.as_i64())
        .bind(to_account_id.as_i64())
        .bind(amount)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;

        Ok(row.into_domain())
    }
}

#[async_trait]
impl LedgerTx for SqliteLedgerTx {
    async fn commit(self) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(db_err)
    }

    async fn rollback(self) -> Result<(), RepoError> {
        self.tx.rollback().await.map_err(db_err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for SqliteLedger {
    type Tx = SqliteLedgerTx;

    async fn begin(&self) -> Result<SqliteLedgerTx, RepoError> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(SqliteLedgerTx { tx })
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, RepoError> {
        params.validate()?;

        let row: DbAccount = sqlx::query_as(
            r#"INSERT INTO accounts (owner, balance, currency, created_at) VALUES (?, ?, ?, ?)
               RETURNING id, owner, balance, currency, created_at"#,
        )
        .bind(&params.owner)
        .bind(params.balance)
        .bind(params.currency.code())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.into_domain()
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, owner, balance, currency, created_at FROM accounts WHERE id = ?"#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, RepoError> {
        let rows: Vec<DbAccount> = sqlx::query_as(
            r#"SELECT id, owner, balance, currency, created_at FROM accounts
               WHERE (?1 IS NULL OR owner = ?1)
               ORDER BY id LIMIT ?2 OFFSET ?3"#,
        )
        .bind(params.owner.as_deref())
        .bind(params.page.limit)
        .bind(params.page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbAccount::into_domain).collect()
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM accounts WHERE id = ?"#)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, RepoError> {
        let row: Option<DbEntry> =
            sqlx::query_as(r#"SELECT id, account_id, amount, created_at FROM entries WHERE id = ?"#)
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(DbEntry::into_domain))
    }

    async fn list_entries(&self, account_id: AccountId, page: Page) -> Result<Vec<Entry>, RepoError> {
        let rows: Vec<DbEntry> = sqlx::query_as(
            r#"SELECT id, account_id, amount, created_at FROM entries
               WHERE account_id = ? ORDER BY id LIMIT ? OFFSET ?"#,
        )
        .bind(account_id.as_i64())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(DbEntry::into_domain).collect())
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError> {
        let row: Option<DbTransfer> = sqlx::query_as(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at FROM transfers WHERE id = ?"#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(DbTransfer::into_domain))
    }

    async fn list_transfers(
        &self,
        filter: TransferFilter,
        page: Page,
    ) -> Result<Vec<Transfer>, RepoError> {
        let rows: Vec<DbTransfer> = sqlx::query_as(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at FROM transfers
               WHERE (?1 IS NULL OR from_account_id = ?1)
                 AND (?2 IS NULL OR to_account_id = ?2)
               ORDER BY id LIMIT ?3 OFFSET ?4"#,
        )
        .bind(filter.from_account_id.map(|id| id.as_i64()))
        .bind(filter.to_account_id.map(|id| id.as_i64()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(DbTransfer::into_domain).collect())
    }
}
