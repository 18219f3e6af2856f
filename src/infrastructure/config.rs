use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::Level;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub default_account_id: String,
    pub seed_file: Option<PathBuf>,
    pub observer_buffer: usize,
    pub log_dir: Option<PathBuf>,
    pub log_level: Level,
}

impl AppConfig {
    /// Reads `LEDGER_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("LEDGER_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "LEDGER_PORT")?.unwrap_or(defaults.port),
            static_dir: lookup("LEDGER_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            default_account_id: lookup("LEDGER_DEFAULT_ACCOUNT")
                .unwrap_or(defaults.default_account_id),
            seed_file: lookup("LEDGER_SEED_FILE").map(PathBuf::from),
            observer_buffer: match parse_var::<usize, _>(&lookup, "LEDGER_OBSERVER_BUFFER")? {
                Some(0) => anyhow::bail!("LEDGER_OBSERVER_BUFFER must be at least 1"),
                Some(n) => n,
                None => defaults.observer_buffer,
            },
            log_dir: lookup("LEDGER_LOG_DIR").map(PathBuf::from),
            log_level: parse_var(&lookup, "LEDGER_LOG_LEVEL")?.unwrap_or(defaults.log_level),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("./"),
            default_account_id: "8001234567".to_string(),
            seed_file: None,
            observer_buffer: 100,
            log_dir: None,
            log_level: Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_account_id, "8001234567");
        assert_eq!(config.observer_buffer, 100);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.seed_file.is_none());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("LEDGER_HOST", "127.0.0.1"),
            ("LEDGER_PORT", "9090"),
            ("LEDGER_OBSERVER_BUFFER", "8"),
            ("LEDGER_LOG_LEVEL", "debug"),
            ("LEDGER_SEED_FILE", "seed.json"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.observer_buffer, 8);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.seed_file, Some(PathBuf::from("seed.json")));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(AppConfig::from_lookup(lookup_from(&[("LEDGER_PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("LEDGER_OBSERVER_BUFFER", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("LEDGER_LOG_LEVEL", "loud")])).is_err());
    }
}
