use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Business result code for a successful call, as reported in the API envelope.
pub const CODE_SUCCESS: u32 = 200;
pub const CODE_PARAM_ERROR: u32 = 1000;
pub const CODE_ACCOUNT_NOT_EXIST: u32 = 2000;
pub const CODE_ACCOUNT_FROZEN: u32 = 2001;
pub const CODE_BALANCE_NOT_ENOUGH: u32 = 2002;
pub const CODE_TARGET_ACCOUNT_ABNORMAL: u32 = 2003;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Normal,
    Frozen,
}

impl AccountStatus {
    pub fn is_normal(self) -> bool {
        matches!(self, AccountStatus::Normal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    pub user_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        account_id: impl Into<String>,
        user_name: impl Into<String>,
        balance: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Account {
            account_id: account_id.into(),
            user_name: user_name.into(),
            balance,
            status: AccountStatus::Normal,
            created_at,
        }
    }

    pub fn frozen(mut self) -> Self {
        self.status = AccountStatus::Frozen;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositReceipt {
    pub old_balance: Decimal,
    pub new_balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from_old_balance: Decimal,
    pub from_new_balance: Decimal,
    pub to_old_balance: Decimal,
    pub to_new_balance: Decimal,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum AccountError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error("Account {0} not found")]
    AccountNotFound(String),
    #[error("Account {0} is frozen")]
    AccountFrozen(String),
    #[error("Cannot transfer to the same account")]
    SelfTransfer,
    #[error("Source account {0} not found")]
    SourceNotFound(String),
    #[error("Source account {0} is frozen")]
    SourceFrozen(String),
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
    #[error("Destination account {0} not found")]
    DestinationNotFound(String),
    #[error("Destination account {0} is not in normal status")]
    DestinationAbnormal(String),
    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(String),
    #[error("Account {0} already exists")]
    DuplicateAccount(String),
}

impl AccountError {
    /// Stable business code reported to API clients.
    pub fn code(&self) -> u32 {
        match self {
            AccountError::InvalidAmount(_)
            | AccountError::InvalidParams(_)
            | AccountError::SelfTransfer
            | AccountError::BalanceOverflow(_)
            | AccountError::DuplicateAccount(_) => CODE_PARAM_ERROR,
            AccountError::AccountNotFound(_) | AccountError::SourceNotFound(_) => {
                CODE_ACCOUNT_NOT_EXIST
            }
            AccountError::AccountFrozen(_) | AccountError::SourceFrozen(_) => CODE_ACCOUNT_FROZEN,
            AccountError::InsufficientFunds { .. } => CODE_BALANCE_NOT_ENOUGH,
            AccountError::DestinationNotFound(_) | AccountError::DestinationAbnormal(_) => {
                CODE_TARGET_ACCOUNT_ABNORMAL
            }
        }
    }
}
