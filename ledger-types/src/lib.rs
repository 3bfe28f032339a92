//! # Ledger Types
//!
//! Domain types and port traits for the double-entry transfer ledger.
//! This crate has ZERO IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Account, Entry, Transfer) and the lock-ordering policy
//! - `ports/` - Transaction-bound capability traits that adapters must implement
//! - `dto/` - Data Transfer Objects for the engine and API boundaries
//! - `error/` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, Currency, Entry, EntryId, LockOrder, Transfer, TransferId, TransferStage,
    lock_order,
};
pub use dto::*;
pub use error::{AppError, DomainError, ErrorKind, RepoError};
pub use ports::{AccountReader, AccountWriter, EntryWriter, LedgerStore, LedgerTx, TransferWriter};
