//! Shared database row types and error classification for the SQL adapters.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::error::ErrorKind as DbErrorKind;

use ledger_types::{
    Account, AccountId, Currency, Entry, EntryId, RepoError, Transfer, TransferId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    pub id: i64,
    pub owner: String,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Entry row from database.
#[derive(FromRow)]
pub struct DbEntry {
    pub id: i64,
    pub account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Transfer row from database.
#[derive(FromRow)]
pub struct DbTransfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown currency: {}", s)))
}

impl DbAccount {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, RepoError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Account::from_parts(
            AccountId::from_i64(self.id),
            self.owner,
            self.balance,
            currency,
            self.created_at,
        ))
    }
}

impl DbEntry {
    pub fn into_domain(self) -> Entry {
        Entry::from_parts(
            EntryId::from_i64(self.id),
            AccountId::from_i64(self.account_id),
            self.amount,
            self.created_at,
        )
    }
}

impl DbTransfer {
    pub fn into_domain(self) -> Transfer {
        Transfer::from_parts(
            TransferId::from_i64(self.id),
            AccountId::from_i64(self.from_account_id),
            AccountId::from_i64(self.to_account_id),
            self.amount,
            self.created_at,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error classification
// ─────────────────────────────────────────────────────────────────────────────

/// SQLSTATE codes (Postgres) and result codes (SQLite) worth retrying.
const TRANSIENT_CODES: &[&str] = &[
    // Postgres: serialization_failure, deadlock_detected, lock_not_available,
    // query_canceled (statement/lock timeout), too_many_connections
    "40001", "40P01", "55P03", "57014", "53300",
    // SQLite: BUSY, LOCKED, BUSY_RECOVERY, LOCKED_SHAREDCACHE, BUSY_SNAPSHOT
    "5", "6", "261", "262", "517",
];

fn is_transient_code(code: &str) -> bool {
    // Postgres class 08: connection exceptions
    TRANSIENT_CODES.contains(&code) || code.starts_with("08")
}

/// Classifies a driver error into the ledger's closed error taxonomy.
pub fn db_err(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::WorkerCrashed => RepoError::Transient(err.to_string()),
        sqlx::Error::Database(db) => match db.kind() {
            DbErrorKind::UniqueViolation | DbErrorKind::ForeignKeyViolation => {
                RepoError::Conflict(db.message().to_string())
            }
            DbErrorKind::CheckViolation => RepoError::Invariant(db.message().to_string()),
            _ => {
                let transient = db.code().is_some_and(|code| is_transient_code(&code));
                if transient {
                    RepoError::Transient(err.to_string())
                } else {
                    RepoError::Database(err.to_string())
                }
            }
        },
        _ => RepoError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_codes() {
        assert!(is_transient_code("40P01"));
        assert!(is_transient_code("55P03"));
        assert!(is_transient_code("08006"));
        assert!(is_transient_code("5"));
        assert!(!is_transient_code("23505"));
        assert!(!is_transient_code("42P01"));
    }

    #[test]
    fn test_pool_errors_are_transient() {
        assert!(db_err(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(matches!(
            db_err(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn test_unknown_currency_is_a_database_error() {
        let row = DbAccount {
            id: 1,
            owner: "alice".into(),
            balance: 0,
            currency: "XYZ".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(row.into_domain(), Err(RepoError::Database(_))));
    }
}
