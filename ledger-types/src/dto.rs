//! Data Transfer Objects (DTOs) for requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountId, Currency, Entry, Transfer};
use crate::error::DomainError;

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to open a new account. Accounts always open with a zero balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    /// Owner reference of the account holder
    pub owner: String,
    pub currency: Currency,
}

/// Store-level parameters for inserting an account.
///
/// `balance` is the opening balance; only administrative tooling and tests
/// open accounts with a non-zero balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub owner: String,
    pub currency: Currency,
    pub balance: i64,
}

impl CreateAccountParams {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.owner.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Account owner cannot be empty".into(),
            ));
        }
        if self.balance < 0 {
            return Err(DomainError::ValidationError(
                "Opening balance cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

impl From<CreateAccountRequest> for CreateAccountParams {
    fn from(req: CreateAccountRequest) -> Self {
        Self {
            owner: req.owner,
            currency: req.currency,
            balance: 0,
        }
    }
}

/// Query string for paginated account listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAccountsQuery {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_page_id")]
    pub page_id: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_id() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

pub const MIN_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 10;

impl ListAccountsQuery {
    /// Validates paging bounds and converts into store parameters.
    pub fn into_params(self) -> Result<ListAccountsParams, DomainError> {
        if self.page_id < 1 {
            return Err(DomainError::ValidationError(
                "page_id must be at least 1".into(),
            ));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(DomainError::ValidationError(format!(
                "page_size must be between {} and {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        let offset = (self.page_id - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| DomainError::ValidationError("page_id is too large".into()))?;
        Ok(ListAccountsParams {
            owner: self.owner,
            page: Page {
                limit: self.page_size,
                offset,
            },
        })
    }
}

/// Limit/offset window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// Store-level parameters for listing accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAccountsParams {
    pub owner: Option<String>,
    pub page: Page,
}

/// Filter for listing transfers; either side may be left open.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TransferFilter {
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfer DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Input of the transfer engine: move `amount` from one account to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Amount in minor currency units, must be positive
    pub amount: i64,
}

impl TransferParams {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount <= 0 {
            return Err(DomainError::NonPositiveAmount(self.amount));
        }
        Ok(())
    }
}

/// Transfer request as submitted by an API client.
///
/// Carries the currency the client expects both accounts to be held in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
    pub currency: Currency,
}

impl From<&TransferRequest> for TransferParams {
    fn from(req: &TransferRequest) -> Self {
        TransferParams::new(req.from_account_id, req.to_account_id, req.amount)
    }
}

/// Everything a committed transfer produced, as observed inside its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    pub from_account: Account,
    pub to_account: Account,
}
