//! Transfer orchestrator.
//!
//! Moves funds between two accounts inside one storage transaction:
//!
//! 1. lock both accounts in ascending id order (one lock for a self-transfer)
//! 2. check the source balance while the locks are held
//! 3. write the transfer record and its two entries
//! 4. apply both balance deltas
//! 5. commit
//!
//! Any failure rolls the whole transaction back. The entire attempt runs
//! under a deadline; when it expires the in-flight transaction is dropped,
//! which rolls it back and releases its locks.

use std::time::Duration;

use tracing::{debug, info, warn};

use ledger_types::{
    Account, Entry, LedgerStore, LedgerTx, RepoError, TransferParams, TransferResult,
    TransferStage, lock_order,
};

/// Deadline applied when the caller does not supply one.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs transfers against a [`LedgerStore`].
pub struct TransferEngine<S: LedgerStore> {
    store: S,
    timeout: Duration,
}

impl<S: LedgerStore> TransferEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }

    /// Replaces the default per-transfer deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Transfers `amount` under the engine's default deadline.
    pub async fn transfer(&self, params: TransferParams) -> Result<TransferResult, RepoError> {
        self.transfer_within(params, self.timeout).await
    }

    /// Transfers `amount` under a caller-supplied deadline.
    ///
    /// Validation happens before a transaction is opened. Expiry of the
    /// deadline yields [`RepoError::DeadlineExceeded`], which is retryable.
    #[tracing::instrument(
        skip(self, params),
        fields(
            from = %params.from_account_id,
            to = %params.to_account_id,
            amount = params.amount,
        )
    )]
    pub async fn transfer_within(
        &self,
        params: TransferParams,
        timeout: Duration,
    ) -> Result<TransferResult, RepoError> {
        params.validate()?;

        match tokio::time::timeout(timeout, self.run(&params)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    stage = %TransferStage::Aborted,
                    timeout_ms = whole_millis(timeout),
                    "Transfer deadline exceeded"
                );
                Err(RepoError::DeadlineExceeded(timeout))
            }
        }
    }

    async fn run(&self, params: &TransferParams) -> Result<TransferResult, RepoError> {
        let mut tx = self.store.begin().await?;
        debug!(stage = %TransferStage::Started, "Transaction opened");

        match execute(&mut tx, params).await {
            Ok(result) => {
                if let Err(err) = tx.commit().await {
                    warn!(stage = %TransferStage::Aborted, error = %err, "Commit failed");
                    return Err(err);
                }
                info!(
                    stage = %TransferStage::Committed,
                    transfer_id = %result.transfer.id,
                    "Transfer committed"
                );
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                if err.is_retryable() || matches!(err, RepoError::Domain(_)) {
                    info!(stage = %TransferStage::Aborted, kind = %err.kind(), error = %err, "Transfer aborted");
                } else {
                    warn!(stage = %TransferStage::Aborted, kind = %err.kind(), error = %err, "Transfer aborted");
                }
                Err(err)
            }
        }
    }
}

/// Executes the transfer steps on an already open transaction.
///
/// Does not commit or roll back; the caller owns the transaction.
pub async fn execute<T: LedgerTx>(
    tx: &mut T,
    params: &TransferParams,
) -> Result<TransferResult, RepoError> {
    let from_id = params.from_account_id;
    let to_id = params.to_account_id;
    let amount = params.amount;

    let order = lock_order(from_id, to_id);
    let mut source = None;
    let mut destination = None;
    for id in order.distinct() {
        let account = tx.get_account_for_update(id).await?;
        if id == from_id {
            source = Some(account.clone());
        }
        if id == to_id {
            destination = Some(account);
        }
    }
    let (Some(source), Some(destination)) = (source, destination) else {
        return Err(RepoError::Invariant(
            "lock set does not cover both accounts".into(),
        ));
    };
    debug!(stage = %TransferStage::LocksAcquired, first = %order.first, second = %order.second);

    source.ensure_funds(amount)?;
    if !order.is_single() {
        destination.ensure_credit(amount)?;
    }
    debug!(stage = %TransferStage::BalanceValidated, available = source.balance);

    let transfer = tx.create_transfer(from_id, to_id, amount).await?;
    let from_entry = tx.create_entry(from_id, -amount).await?;
    let to_entry = tx.create_entry(to_id, amount).await?;

    // Deltas follow lock order; a self-transfer debits before it credits.
    let (from_account, to_account) = if order.is_single() {
        tx.add_account_balance(from_id, -amount).await?;
        let account = tx.add_account_balance(to_id, amount).await?;
        (account.clone(), account)
    } else if order.is_first(from_id) {
        let from_account = tx.add_account_balance(from_id, -amount).await?;
        let to_account = tx.add_account_balance(to_id, amount).await?;
        (from_account, to_account)
    } else {
        let to_account = tx.add_account_balance(to_id, amount).await?;
        let from_account = tx.add_account_balance(from_id, -amount).await?;
        (from_account, to_account)
    };

    verify_postconditions(
        &source,
        &destination,
        &from_entry,
        &to_entry,
        &from_account,
        &to_account,
        amount,
    )?;
    debug!(stage = %TransferStage::RecordsWritten, transfer_id = %transfer.id);

    Ok(TransferResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}

fn verify_postconditions(
    source: &Account,
    destination: &Account,
    from_entry: &Entry,
    to_entry: &Entry,
    from_account: &Account,
    to_account: &Account,
    amount: i64,
) -> Result<(), RepoError> {
    if from_entry.amount + to_entry.amount != 0 {
        return Err(RepoError::Invariant(format!(
            "entries do not balance: {} + {}",
            from_entry.amount, to_entry.amount
        )));
    }
    if from_account.balance < 0 || to_account.balance < 0 {
        return Err(RepoError::Invariant("negative balance after transfer".into()));
    }

    let (expected_from, expected_to) = if source.id == destination.id {
        (source.balance, source.balance)
    } else {
        (source.balance - amount, destination.balance + amount)
    };
    if from_account.balance != expected_from || to_account.balance != expected_to {
        return Err(RepoError::Invariant(format!(
            "balances drifted: expected {}/{}, got {}/{}",
            expected_from, expected_to, from_account.balance, to_account.balance
        )));
    }
    Ok(())
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
