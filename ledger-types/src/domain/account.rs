//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::currency::Currency;
use crate::error::DomainError;

/// Unique identifier for an Account.
///
/// Ordered so the lock-ordering policy can rank two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    /// Creates an AccountId from a raw database identity.
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identity value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// An account holding a balance in a single currency.
///
/// The balance is kept in minor units and is never negative outside an
/// in-flight transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Owner reference (username of the account holder)
    pub owner: String,
    /// Current balance in minor currency units
    pub balance: i64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates an account with all fields specified (for database reconstruction).
    pub fn from_parts(
        id: AccountId,
        owner: String,
        balance: i64,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            balance,
            currency,
            created_at,
        }
    }

    /// Checks if the account can be debited by `amount`.
    pub fn has_sufficient_funds(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Ensures the account can be debited by `amount`.
    pub fn ensure_funds(&self, amount: i64) -> Result<(), DomainError> {
        if self.has_sufficient_funds(amount) {
            Ok(())
        } else {
            Err(DomainError::InsufficientFunds {
                account_id: self.id,
                available: self.balance,
                requested: amount,
            })
        }
    }

    /// Ensures crediting `amount` does not overflow the balance.
    pub fn ensure_credit(&self, amount: i64) -> Result<(), DomainError> {
        self.balance
            .checked_add(amount)
            .map(|_| ())
            .ok_or(DomainError::BalanceOverflow(self.id))
    }
}
