//! Opening accounts loaded at startup.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use tracing::info;

use crate::domain::Account;
use crate::infrastructure::account_store::AccountStore;

/// The two demo accounts the front end expects.
pub fn default_accounts() -> Vec<Account> {
    vec![
        Account::new("8001234567", "Zhang San", dec!(12580.00), date(2023, 6, 15)),
        Account::new("8001234568", "Li Si", dec!(5000.00), date(2023, 7, 20)),
    ]
}

fn date(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_default()
}

/// Reads a JSON array of accounts.
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse seed file {}", path.display()))
}

/// Builds the store from `seed_file`, or the built-in accounts when unset.
pub fn seeded_store(seed_file: Option<&Path>) -> Result<AccountStore> {
    let accounts = match seed_file {
        Some(path) => load_accounts(path)?,
        None => default_accounts(),
    };
    let store = AccountStore::with_accounts(accounts).context("invalid seed accounts")?;
    for account in store.accounts() {
        info!(
            account_id = %account.account_id,
            user_name = %account.user_name,
            balance = %account.balance,
            status = ?account.status,
            "seeded account"
        );
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountStatus;

    #[test]
    fn test_default_seed() {
        let store = seeded_store(None).unwrap();
        assert_eq!(store.len(), 2);
        let account = store.get_account("8001234567").unwrap();
        assert_eq!(account.balance, dec!(12580));
        assert_eq!(account.status, AccountStatus::Normal);
        assert_eq!(account.created_at.date_naive().to_string(), "2023-06-15");
    }

    #[test]
    fn test_seed_file() {
        let path = std::env::temp_dir().join(format!("ledger-seed-{}.json", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"[
                {"accountId":"A","userName":"Ann","balance":10.5,"status":"normal","createdAt":"2024-01-01T00:00:00Z"},
                {"accountId":"F","userName":"Fay","balance":3,"status":"frozen","createdAt":"2024-01-02T00:00:00Z"}
            ]"#,
        )
        .unwrap();

        let store = seeded_store(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(store.get_account("A").unwrap().balance, dec!(10.5));
        assert_eq!(store.get_account("F").unwrap().status, AccountStatus::Frozen);
    }

    #[test]
    fn test_seed_file_with_duplicates_fails() {
        let path = std::env::temp_dir().join(format!("ledger-seed-{}.json", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"[
                {"accountId":"A","userName":"Ann","balance":1,"status":"normal","createdAt":"2024-01-01T00:00:00Z"},
                {"accountId":"A","userName":"Ann","balance":2,"status":"normal","createdAt":"2024-01-01T00:00:00Z"}
            ]"#,
        )
        .unwrap();
        let result = seeded_store(Some(&path));
        fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
