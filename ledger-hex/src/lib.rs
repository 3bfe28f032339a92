//! # Ledger Hex
//!
//! Transfer orchestrator, application service and HTTP adapter for the
//! double-entry ledger.
//!
//! ## Architecture
//!
//! - `transfer/` - Transfer orchestrator (one storage transaction per transfer)
//! - `service/` - Application service (caller-side checks, administration)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Everything is generic over `S: LedgerStore`, allowing different storage
//! adapters to be injected.

pub mod inbound;
pub mod service;
pub mod transfer;


pub use service::LedgerService;
pub use transfer::{DEFAULT_TRANSFER_TIMEOUT, TransferEngine};
