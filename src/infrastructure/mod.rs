pub mod account_store;
pub mod config;
pub mod logging;
pub mod notifications;
pub mod seed;
pub mod websocket;

pub use account_store::AccountStore;
pub use config::AppConfig;
pub use notifications::{
    BroadcastReport, Connection, ConnectionError, ConnectionId, ConnectionState, NotificationHub,
};
pub use websocket::WsConnection;
