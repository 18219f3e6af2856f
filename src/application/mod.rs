pub mod services;

pub use services::LedgerService;
