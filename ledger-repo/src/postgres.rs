//! PostgreSQL repository adapter.
//!
//! Row locks are taken with `SELECT ... FOR NO KEY UPDATE`, which excludes
//! every other locker and writer of the row but still lets concurrent
//! foreign-key checks from `entries`/`transfers` inserts through.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use ledger_types::{
    Account, AccountId, AccountReader, AccountWriter, CreateAccountParams, DomainError, Entry,
    EntryId, EntryWriter, LedgerStore, LedgerTx, ListAccountsParams, Page, RepoError, Transfer,
    TransferFilter, TransferId, TransferWriter,
};

use crate::RepoOptions;
use crate::types::{DbAccount, DbEntry, DbTransfer, db_err};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL ledger with row-level locking.
pub struct PostgresLedger {
    pool: PgPool,
    lock_timeout: Duration,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_ledger_tables_pg.sql"),
        "0001",
    )
    .await
}

impl PostgresLedger {
    /// Connects, runs migrations and returns a ready ledger.
    pub async fn new(database_url: &str, options: &RepoOptions) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await?;
        run_migrations(&pool).await?;
        tracing::debug!(
            max_connections = options.max_connections,
            lock_timeout_ms = options.lock_timeout_ms(),
            "Postgres ledger ready"
        );
        Ok(Self {
            pool,
            lock_timeout: options.lock_timeout,
        })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction-bound capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// An open Postgres transaction. Dropping it rolls back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountReader for PgLedgerTx {
    async fn get_account(&mut self, id: AccountId) -> Result<Account, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, owner, balance, currency, created_at FROM accounts WHERE id = $1"#,
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;

        row.ok_or(RepoError::Domain(DomainError::AccountNotFound(id)))?
            .into_domain()
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, owner, balance, currency, created_at FROM accounts WHERE id = $1 FOR NO KEY UPDATE"#,
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
impl AccountWriter for PgLedgerTx {
    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"UPDATE accounts SET balance = balance + $1 WHERE id = $2
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
impl EntryWriter for PgLedgerTx {
    async fn create_entry(&mut self, account_id: AccountId, amount: i64) -> Result<Entry, RepoError> {
        let row: DbEntry = sqlx::query_as(
            r#"INSERT INTO entries (account_id, amount, created_at) VALUES ($1, $2, $3)
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
impl TransferWriter for PgLedgerTx {
    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, RepoError> {
        let row: DbTransfer = sqlx::query_as(
            r#"INSERT INTO transfers (from_account_id, to_account_id, amount, created_at)
               VALUES ($1, $2, $3, $4)
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
impl LedgerTx for PgLedgerTx {
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
impl LedgerStore for PostgresLedger {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<PgLedgerTx, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // SET does not take bind parameters; the value is an integer we own.
        let millis = self.lock_timeout.as_millis();
        if millis > 0 {
            sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", millis))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        Ok(PgLedgerTx { tx })
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, RepoError> {
        params.validate()?;

        let row: DbAccount = sqlx::query_as(
            r#"INSERT INTO accounts (owner, balance, currency, created_at) VALUES ($1, $2, $3, $4)
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
            r#"SELECT id, owner, balance, currency, created_at FROM accounts WHERE id = $1"#,
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
               WHERE ($1::varchar IS NULL OR owner = $1)
               ORDER BY id LIMIT $2 OFFSET $3"#,
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
        let result = sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, RepoError> {
        let row: Option<DbEntry> = sqlx::query_as(
            r#"SELECT id, account_id, amount, created_at FROM entries WHERE id = $1"#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(DbEntry::into_domain))
    }

    async fn list_entries(&self, account_id: AccountId, page: Page) -> Result<Vec<Entry>, RepoError> {
        let rows: Vec<DbEntry> = sqlx::query_as(
            r#"SELECT id, account_id, amount, created_at FROM entries
               WHERE account_id = $1 ORDER BY id LIMIT $2 OFFSET $3"#,
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
            r#"SELECT id, from_account_id, to_account_id, amount, created_at FROM transfers WHERE id = $1"#,
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
               WHERE ($1::bigint IS NULL OR from_account_id = $1)
                 AND ($2::bigint IS NULL OR to_account_id = $2)
               ORDER BY id LIMIT $3 OFFSET $4"#,
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
