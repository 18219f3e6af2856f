use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::application::LedgerService;
use crate::web::handlers::*;

#[derive(Debug, Clone)]
pub struct AppState {
    pub ledger: LedgerService,
    pub default_account_id: Arc<str>,
    pub observer_buffer: usize,
    /// Parent of every observer session's token.
    pub shutdown: CancellationToken,
}

pub fn create_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(12 * 60 * 60));

    Router::new()
        .route("/api/account", get(get_account))
        .route("/api/deposit", post(deposit))
        .route("/api/transfer", post(transfer))
        .route("/ws", get(websocket_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
