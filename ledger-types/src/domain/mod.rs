//! Domain models for the transfer ledger.

pub mod account;
pub mod currency;
pub mod entry;
pub mod lock_order;
pub mod transfer;

pub use account::{Account, AccountId};
pub use currency::Currency;
pub use entry::{Entry, EntryId};
pub use lock_order::{LockOrder, lock_order};
pub use transfer::{Transfer, TransferId, TransferStage};
