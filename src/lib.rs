pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod web;

// Re-export commonly used types
pub use application::LedgerService;
pub use domain::{Account, AccountError, AccountStatus, NotificationEvent};
pub use infrastructure::{AccountStore, AppConfig, Connection, NotificationHub};
