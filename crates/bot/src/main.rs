//! Gamestore Telegram bot binary.
//!
//! Wires configuration, the SQLite order store, the catalog, and the
//! Telegram client together, then long-polls `getUpdates` until Ctrl+C or
//! SIGTERM. Every received update is handled on its own task.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamestore_bot::catalog::Catalog;
use gamestore_bot::config::BotConfig;
use gamestore_bot::state::AppState;
use gamestore_bot::telegram::TelegramClient;
use gamestore_bot::{db, dispatch};

/// Pause before retrying after a failed `getUpdates` call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = BotConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gamestore_bot=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Open the database and bring the schema up to date
    let pool = db::create_pool(&config.database_path)
        .await
        .expect("Failed to open database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!(path = %config.database_path.display(), "Database ready");

    let catalog = Catalog::load(config.catalog_path.as_deref()).expect("Failed to load catalog");
    tracing::info!(items = catalog.items().len(), "Catalog loaded");

    let client =
        TelegramClient::new(config.bot_token.clone()).expect("Failed to build Telegram client");
    let state = AppState::new(config, pool, catalog, Arc::new(client.clone()));

    tracing::info!("gamestore bot polling for updates");
    run_poll_loop(&state, &client).await;
    tracing::info!("Shutdown complete");
}

/// Long-poll `getUpdates` and spawn a handler task per update.
///
/// Poll failures are logged and retried after a short pause; they never
/// stop the loop. The confirmed offset only moves past updates that have
/// been handed to a task.
async fn run_poll_loop(state: &AppState, client: &TelegramClient) {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut offset: Option<i64> = None;
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            result = client.get_updates(offset) => match result {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        tokio::spawn(dispatch::handle_update(state.clone(), update));
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
