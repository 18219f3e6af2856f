use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{Account, AccountError, DepositReceipt, NotificationEvent, TransferReceipt};
use crate::infrastructure::{AccountStore, NotificationHub};

/// Composes the ledger with the notification hub.
///
/// Every mutation is committed and the store's lock released before any
/// event is built, so a slow observer can never hold up the ledger and no
/// event ever describes a state that did not commit.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<AccountStore>,
    hub: Arc<NotificationHub>,
}

impl LedgerService {
    pub fn new(store: Arc<AccountStore>, hub: Arc<NotificationHub>) -> Self {
        Self { store, hub }
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn get_account(&self, account_id: &str) -> Result<Account, AccountError> {
        let account = self.store.get_account(account_id)?;
        info!(
            account_id,
            user_name = %account.user_name,
            balance = %account.balance,
            status = ?account.status,
            "account queried"
        );
        Ok(account)
    }

    pub fn deposit(&self, account_id: &str, amount: Decimal) -> Result<DepositReceipt, AccountError> {
        let receipt = self.store.deposit(account_id, amount).map_err(|e| {
            warn!(account_id, %amount, code = e.code(), "Deposit rejected: {}", e);
            e
        })?;
        info!(
            account_id,
            %amount,
            old_balance = %receipt.old_balance,
            new_balance = %receipt.new_balance,
            "deposit succeeded"
        );

        self.hub.broadcast(&NotificationEvent::BalanceUpdate {
            new_balance: receipt.new_balance,
        });
        self.hub.broadcast(&NotificationEvent::TransactionAlert {
            message: format!(
                "Deposit succeeded: +{:.2}, balance: {:.2}",
                amount, receipt.new_balance
            ),
        });
        Ok(receipt)
    }

    pub fn transfer(
        &self,
        from_id: &str,
        to_id: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, AccountError> {
        let receipt = self.store.transfer(from_id, to_id, amount).map_err(|e| {
            warn!(from_id, to_id, %amount, code = e.code(), "Transfer rejected: {}", e);
            e
        })?;
        info!(
            from_id,
            to_id,
            %amount,
            from_old_balance = %receipt.from_old_balance,
            from_new_balance = %receipt.from_new_balance,
            to_old_balance = %receipt.to_old_balance,
            to_new_balance = %receipt.to_new_balance,
            "transfer succeeded"
        );

        // Observers follow the paying account.
        self.hub.broadcast(&NotificationEvent::BalanceUpdate {
            new_balance: receipt.from_new_balance,
        });
        self.hub.broadcast(&NotificationEvent::TransactionAlert {
            message: format!(
                "Transfer succeeded: -{:.2}, balance: {:.2}",
                amount, receipt.from_new_balance
            ),
        });
        Ok(receipt)
    }
}
