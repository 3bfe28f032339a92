//! Error types for the transfer ledger.

use crate::domain::{AccountId, Currency};

/// Domain-level errors (business rule violations).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Insufficient funds in account {account_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        available: i64,
        requested: i64,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Currency mismatch for account {account_id}: expected {expected}, got {got}")]
    CurrencyMismatch {
        account_id: AccountId,
        expected: Currency,
        got: Currency,
    },

    #[error("Crediting account {0} would overflow its balance")]
    BalanceOverflow(AccountId),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input rejected before any transaction opened
    Validation,
    /// Referenced account or record does not exist
    NotFound,
    /// Source balance below the requested amount
    InsufficientFunds,
    /// Constraint conflict in an administrative operation
    Conflict,
    /// Contention, timeout or connection failure; the whole call may be retried
    Transient,
    /// Invariant violation or unexpected storage failure
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transient => "transient",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            DomainError::AccountNotFound(_) => ErrorKind::NotFound,
            DomainError::NonPositiveAmount(_)
            | DomainError::CurrencyMismatch { .. }
            | DomainError::BalanceOverflow(_)
            | DomainError::UnsupportedCurrency(_)
            | DomainError::ValidationError(_) => ErrorKind::Validation,
        }
    }
}

/// Repository-level errors (data access failures).
///
/// Every error returned from inside a ledger transaction means the
/// transaction was rolled back.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Safe to retry: nothing was written.
    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Ledger invariant violated: {0}")]
    Invariant(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::Domain(e) => e.kind(),
            RepoError::NotFound => ErrorKind::NotFound,
            RepoError::Conflict(_) => ErrorKind::Conflict,
            RepoError::Transient(_) | RepoError::DeadlineExceeded(_) => ErrorKind::Transient,
            RepoError::Database(_) | RepoError::Invariant(_) => ErrorKind::Internal,
        }
    }

    /// Returns true when the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Unavailable(_) => ErrorKind::Transient,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        RepoError::Domain(err).into()
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::InsufficientFunds {
                available,
                requested,
                ..
            }) => AppError::InsufficientFunds {
                available,
                requested,
            },
            RepoError::Domain(DomainError::AccountNotFound(id)) => {
                AppError::NotFound(format!("Account not found: {}", id))
            }
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Conflict(e) => AppError::Conflict(e),
            e @ (RepoError::Transient(_) | RepoError::DeadlineExceeded(_)) => {
                AppError::Unavailable(e.to_string())
            }
            RepoError::Database(e) => AppError::Internal(e),
            e @ RepoError::Invariant(_) => AppError::Internal(e.to_string()),
        }
    }
}
