use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use realtime_ledger::infrastructure::logging::{init_logging, LoggingConfig};
use realtime_ledger::infrastructure::seed::seeded_store;
use realtime_ledger::web::{create_router, AppState};
use realtime_ledger::{AppConfig, LedgerService, NotificationHub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::from_env()?;

    let _log_guard = init_logging(LoggingConfig {
        log_dir: config.log_dir.clone(),
        log_level: config.log_level,
        enable_console: true,
    })?;

    info!("Starting realtime ledger");
    info!("Static files served from {}", config.static_dir.display());

    let store = Arc::new(seeded_store(config.seed_file.as_deref())?);
    let hub = Arc::new(NotificationHub::new());
    let ledger = LedgerService::new(store, hub.clone());

    let shutdown = CancellationToken::new();
    let state = AppState {
        ledger,
        default_account_id: config.default_account_id.as_str().into(),
        observer_buffer: config.observer_buffer,
        shutdown: shutdown.clone(),
    };
    let app = create_router(state, &config.static_dir);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            // Observer read loops never finish on their own; end them first.
            signal_token.cancel();
        })
        .await?;

    hub.close_all();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
