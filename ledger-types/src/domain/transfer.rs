//! Transfer domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::AccountId;

/// Unique identifier for a Transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(i64);

impl TransferId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransferId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A recorded movement of funds between two accounts.
///
/// Transfers are immutable once created - together with their two entries
/// they form the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Positive amount in minor currency units
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn from_parts(
        id: TransferId,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            from_account_id,
            to_account_id,
            amount,
            created_at,
        }
    }

    /// Returns true when source and destination are the same account.
    pub fn is_self_transfer(&self) -> bool {
        self.from_account_id == self.to_account_id
    }
}

/// Stage reached by one transfer attempt.
///
/// An attempt moves forward through the stages and ends either in
/// `Committed` or in `Aborted`; there is no partially committed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Started,
    LocksAcquired,
    BalanceValidated,
    RecordsWritten,
    Committed,
    Aborted,
}

impl TransferStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStage::Committed | TransferStage::Aborted)
    }
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransferStage::Started => "STARTED",
            TransferStage::LocksAcquired => "LOCKS_ACQUIRED",
            TransferStage::BalanceValidated => "BALANCE_VALIDATED",
            TransferStage::RecordsWritten => "RECORDS_WRITTEN",
            TransferStage::Committed => "COMMITTED",
            TransferStage::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_transfer_detection() {
        let a = AccountId::from_i64(1);
        let b = AccountId::from_i64(2);
        let t = Transfer::from_parts(TransferId::from_i64(1), a, b, 10, Utc::now());
        assert!(!t.is_self_transfer());

        let t = Transfer::from_parts(TransferId::from_i64(2), a, a, 10, Utc::now());
        assert!(t.is_self_transfer());
    }

    #[test]
    fn test_only_committed_and_aborted_are_terminal() {
        assert!(TransferStage::Committed.is_terminal());
        assert!(TransferStage::Aborted.is_terminal());
        assert!(!TransferStage::RecordsWritten.is_terminal());
        assert_eq!(TransferStage::LocksAcquired.to_string(), "LOCKS_ACQUIRED");
    }
}
