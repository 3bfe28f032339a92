//! In-memory repository adapter.
//!
//! Emulates a transactional backend: each account has an async row lock held
//! by the transaction that took it, writes are staged inside the transaction
//! and applied atomically on commit. Dropping a transaction discards its
//! writes and releases its locks.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;

use ledger_types::{
    Account, AccountId, AccountReader, AccountWriter, CreateAccountParams, DomainError, Entry,
    EntryId, EntryWriter, LedgerStore, LedgerTx, ListAccountsParams, Page, RepoError, Transfer,
    TransferFilter, TransferId, TransferWriter,
};

#[derive(Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    row_locks: DashMap<AccountId, Arc<tokio::sync::Mutex<()>>>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
}

impl Inner {
    fn state(&self) -> Result<MutexGuard<'_, State>, RepoError> {
        self.state
            .lock()
            .map_err(|_| RepoError::Database("in-memory ledger state poisoned".into()))
    }

    fn row_lock(&self, id: AccountId) -> Arc<tokio::sync::Mutex<()>> {
        self.row_locks.entry(id).or_default().clone()
    }
}

/// Thread-safe in-memory ledger. Cloning shares the same storage.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

fn window<T>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction
// ─────────────────────────────────────────────────────────────────────────────

/// An open in-memory transaction.
pub struct MemoryLedgerTx {
    inner: Arc<Inner>,
    held: HashMap<AccountId, OwnedMutexGuard<()>>,
    staged_balances: HashMap<AccountId, i64>,
    staged_entries: Vec<Entry>,
    staged_transfers: Vec<Transfer>,
}

impl MemoryLedgerTx {
    /// Committed account overlaid with this transaction's staged balance.
    fn read(&self, id: AccountId) -> Result<Account, RepoError> {
        let state = self.inner.state()?;
        let mut account = state
            .accounts
            .get(&id)
            .cloned()
            .ok_or(RepoError::Domain(DomainError::AccountNotFound(id)))?;
        if let Some(balance) = self.staged_balances.get(&id) {
            account.balance = *balance;
        }
        Ok(account)
    }

    fn ensure_exists(&self, id: AccountId) -> Result<(), RepoError> {
        if self.inner.state()?.accounts.contains_key(&id) {
            Ok(())
        } else {
            Err(RepoError::Conflict(format!(
                "account {} referenced by a ledger record does not exist",
                id
            )))
        }
    }
}

#[async_trait]
impl AccountReader for MemoryLedgerTx {
    async fn get_account(&mut self, id: AccountId) -> Result<Account, RepoError> {
        self.read(id)
    }

    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, RepoError> {
        if !self.held.contains_key(&id) {
            // Fail fast instead of queueing on a lock for a missing row.
            self.read(id)?;
            let lock = self.inner.row_lock(id);
            let guard = lock.lock_owned().await;
            self.held.insert(id, guard);
        }
        self.read(id)
    }
}

#[async_trait]
impl AccountWriter for MemoryLedgerTx {
    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, RepoError> {
        if !self.held.contains_key(&id) {
            return Err(RepoError::Invariant(format!(
                "balance of account {} changed without holding its row lock",
                id
            )));
        }

        let mut account = self.read(id)?;
        let balance = account
            .balance
            .checked_add(delta)
            .ok_or_else(|| RepoError::Invariant(format!("balance overflow on account {}", id)))?;
        if balance < 0 {
            return Err(RepoError::Invariant(format!(
                "balance of account {} would become negative",
                id
            )));
        }

        self.staged_balances.insert(id, balance);
        account.balance = balance;
        Ok(account)
    }
}

#[async_trait]
impl EntryWriter for MemoryLedgerTx {
    async fn create_entry(&mut self, account_id: AccountId, amount: i64) -> Result<Entry, RepoError> {
        self.ensure_exists(account_id)?;
        let entry = Entry::from_parts(
            EntryId::from_i64(next_id(&self.inner.entry_seq)),
            account_id,
            amount,
            Utc::now(),
        );
        self.staged_entries.push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl TransferWriter for MemoryLedgerTx {
    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, RepoError> {
        self.ensure_exists(from_account_id)?;
        self.ensure_exists(to_account_id)?;
        if amount <= 0 {
            return Err(RepoError::Invariant(format!(
                "transfer amount must be positive, got {}",
                amount
            )));
        }
        let transfer = Transfer::from_parts(
            TransferId::from_i64(next_id(&self.inner.transfer_seq)),
            from_account_id,
            to_account_id,
            amount,
            Utc::now(),
        );
        self.staged_transfers.push(transfer.clone());
        Ok(transfer)
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn commit(mut self) -> Result<(), RepoError> {
        {
            let mut state = self.inner.state()?;
            if let Some(missing) = self
                .staged_balances
                .keys()
                .find(|id| !state.accounts.contains_key(*id))
            {
                return Err(RepoError::Domain(DomainError::AccountNotFound(*missing)));
            }
            for (id, balance) in self.staged_balances.drain() {
                if let Some(account) = state.accounts.get_mut(&id) {
                    account.balance = balance;
                }
            }
            for entry in self.staged_entries.drain(..) {
                state.entries.insert(entry.id, entry);
            }
            for transfer in self.staged_transfers.drain(..) {
                state.transfers.insert(transfer.id, transfer);
            }
        }
        // Row locks are released when `self.held` drops.
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepoError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Tx = MemoryLedgerTx;

    async fn begin(&self) -> Result<MemoryLedgerTx, RepoError> {
        Ok(MemoryLedgerTx {
            inner: self.inner.clone(),
            held: HashMap::new(),
            staged_balances: HashMap::new(),
            staged_entries: Vec::new(),
            staged_transfers: Vec::new(),
        })
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, RepoError> {
        params.validate()?;

        let mut state = self.inner.state()?;
        let duplicate = state
            .accounts
            .values()
            .any(|a| a.owner == params.owner && a.currency == params.currency);
        if duplicate {
            return Err(RepoError::Conflict(format!(
                "owner {} already has a {} account",
                params.owner, params.currency
            )));
        }

        let account = Account::from_parts(
            AccountId::from_i64(next_id(&self.inner.account_seq)),
            params.owner,
            params.balance,
            params.currency,
            Utc::now(),
        );
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        Ok(self.inner.state()?.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self, params: ListAccountsParams) -> Result<Vec<Account>, RepoError> {
        let state = self.inner.state()?;
        let matching = state
            .accounts
            .values()
            .filter(|a| params.owner.as_deref().is_none_or(|owner| a.owner == owner))
            .cloned();
        Ok(window(matching, params.page))
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, RepoError> {
        let mut state = self.inner.state()?;
        let referenced = state.entries.values().any(|e| e.account_id == id)
            || state
                .transfers
                .values()
                .any(|t| t.from_account_id == id || t.to_account_id == id);
        if referenced {
            return Err(RepoError::Conflict(format!(
                "account {} is referenced by ledger records",
                id
            )));
        }
        let removed = state.accounts.remove(&id).is_some();
        if removed {
            // Keep a lock some transaction still references.
            self.inner
                .row_locks
                .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        }
        Ok(removed)
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, RepoError> {
        Ok(self.inner.state()?.entries.get(&id).cloned())
    }

    async fn list_entries(&self, account_id: AccountId, page: Page) -> Result<Vec<Entry>, RepoError> {
        let state = self.inner.state()?;
        let matching = state
            .entries
            .values()
            .filter(|e| e.account_id == account_id)
            .cloned();
        Ok(window(matching, page))
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError> {
        Ok(self.inner.state()?.transfers.get(&id).cloned())
    }

    async fn list_transfers(
        &self,
        filter: TransferFilter,
        page: Page,
    ) -> Result<Vec<Transfer>, RepoError> {
        let state = self.inner.state()?;
        let matching = state
            .transfers
            .values()
            .filter(|t| filter.from_account_id.is_none_or(|id| t.from_account_id == id))
            .filter(|t| filter.to_account_id.is_none_or(|id| t.to_account_id == id))
            .cloned();
        Ok(window(matching, page))
    }
}
