//! In-memory ledger of accounts.
//!
//! [`AccountStore`] is the single owner of every [`Account`] record. All reads
//! and writes go through one store-wide `RwLock`: mutations take the write
//! guard for the whole validate-then-apply sequence, so no caller can observe
//! a half-applied transfer or act on a stale balance. Callers only ever
//! receive cloned snapshots.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{Account, AccountError, DepositReceipt, TransferReceipt};

#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from provisioned accounts.
    ///
    /// Rejects duplicate ids and negative opening balances so the
    /// non-negative balance invariant holds from the first call.
    pub fn with_accounts<I>(accounts: I) -> Result<Self, AccountError>
    where
        I: IntoIterator<Item = Account>,
    {
        let mut map = HashMap::new();
        for account in accounts {
            if account.account_id.is_empty() {
                return Err(AccountError::InvalidParams(
                    "account id must not be empty".to_string(),
                ));
            }
            if account.balance < Decimal::ZERO {
                return Err(AccountError::InvalidAmount(account.balance));
            }
            if map.contains_key(&account.account_id) {
                return Err(AccountError::DuplicateAccount(account.account_id));
            }
            map.insert(account.account_id.clone(), account);
        }
        Ok(Self {
            accounts: RwLock::new(map),
        })
    }

    // Every critical section finishes its writes before anything can panic,
    // so a poisoned lock still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Account>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Account>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_account(&self, account_id: &str) -> Result<Account, AccountError> {
        self.read()
            .get(account_id)
            .cloned()
            .ok_or_else(|| AccountError::AccountNotFound(account_id.to_string()))
    }

    /// Snapshot of all accounts, ordered by id.
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<_> = self.read().values().cloned().collect();
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        accounts
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Credits `amount` to `account_id`.
    ///
    /// Checks, in order: amount is positive, id is non-empty, account exists,
    /// account is not frozen. An empty id is `InvalidParams`, not `AccountNotFound`.
    /// A credit that would pass `Decimal::MAX` is `BalanceOverflow` and leaves
    /// the balance untouched.
    pub fn deposit(&self, account_id: &str, amount: Decimal) -> Result<DepositReceipt, AccountError> {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount(amount));
        }
        if account_id.is_empty() {
            return Err(AccountError::InvalidParams(
                "account id must not be empty".to_string(),
            ));
        }

        let mut accounts = self.write();
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| AccountError::AccountNotFound(account_id.to_string()))?;
        if !account.status.is_normal() {
            return Err(AccountError::AccountFrozen(account_id.to_string()));
        }

        let old_balance = account.balance;
        let new_balance = old_balance
            .checked_add(amount)
            .ok_or_else(|| AccountError::BalanceOverflow(account_id.to_string()))?;
        account.balance = new_balance;
        debug!(account_id, %old_balance, new_balance = %account.balance, "deposit applied");

        Ok(DepositReceipt {
            old_balance,
            new_balance: account.balance,
        })
    }

    /// Moves `amount` from `from_id` to `to_id` as one indivisible step.
    ///
    /// The order of the checks decides which error a malformed request gets:
    /// amount, ids, self transfer, source existence, source status, funds,
    /// destination existence, destination status.
    pub fn transfer(
        &self,
        from_id: &str,
        to_id: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, AccountError> {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount(amount));
        }
        if from_id.is_empty() || to_id.is_empty() {
            return Err(AccountError::InvalidParams(
                "source and destination account ids must not be empty".to_string(),
            ));
        }
        if from_id == to_id {
            return Err(AccountError::SelfTransfer);
        }

        let mut accounts = self.write();

        let source = accounts
            .get(from_id)
            .ok_or_else(|| AccountError::SourceNotFound(from_id.to_string()))?;
        if !source.status.is_normal() {
            return Err(AccountError::SourceFrozen(from_id.to_string()));
        }
        if source.balance < amount {
            return Err(AccountError::InsufficientFunds {
                available: source.balance,
                requested: amount,
            });
        }
        let from_old_balance = source.balance;

        let destination = accounts
            .get(to_id)
            .ok_or_else(|| AccountError::DestinationNotFound(to_id.to_string()))?;
        if !destination.status.is_normal() {
            return Err(AccountError::DestinationAbnormal(to_id.to_string()));
        }
        let to_old_balance = destination.balance;

        // All checks passed; both legs are applied before the guard drops.
        let from_new_balance = from_old_balance - amount;
        let to_new_balance = to_old_balance
            .checked_add(amount)
            .ok_or_else(|| AccountError::BalanceOverflow(to_id.to_string()))?;
        if let Some(source) = accounts.get_mut(from_id) {
            source.balance = from_new_balance;
        }
        if let Some(destination) = accounts.get_mut(to_id) {
            destination.balance = to_new_balance;
        }
        debug!(from_id, to_id, %amount, "transfer applied");

        Ok(TransferReceipt {
            from_old_balance,
            from_new_balance,
            to_old_balance,
            to_new_balance,
        })
    }
}
