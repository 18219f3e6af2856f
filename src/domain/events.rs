use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A notification pushed to every connected observer.
///
/// Serializes as `{"type":"balanceUpdate","newBalance":600.0}` or
/// `{"type":"transactionAlert","message":"..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationEvent {
    #[serde(rename_all = "camelCase")]
    BalanceUpdate {
        #[serde(with = "rust_decimal::serde::float")]
        new_balance: Decimal,
    },
    TransactionAlert { message: String },
}

impl NotificationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::BalanceUpdate { .. } => "balanceUpdate",
            NotificationEvent::TransactionAlert { .. } => "transactionAlert",
        }
    }
}
