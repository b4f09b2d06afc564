//! Application state shared across update handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::catalog::Catalog;
use crate::config::BotConfig;
use crate::notifier::OrderNotifier;
use crate::session::SessionRegistry;
use crate::transport::Transport;

/// Application state shared across all update handlers.
///
/// Cheaply cloneable via `Arc`; every spawned update task gets its own
/// handle to the same pool, catalog, and session registry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BotConfig,
    pool: SqlitePool,
    catalog: Arc<Catalog>,
    sessions: SessionRegistry,
    transport: Arc<dyn Transport>,
    notifier: OrderNotifier,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: BotConfig,
        pool: SqlitePool,
        catalog: Catalog,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let notifier = OrderNotifier::new(
            Arc::clone(&transport),
            config.orders_channel_id,
            Arc::clone(&catalog),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                sessions: SessionRegistry::new(),
                transport,
                notifier,
            }),
        }
    }

    /// Get a reference to the bot configuration.
    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the per-user session registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    /// Get a reference to the outbound transport.
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    /// Get a reference to the operator notifier.
    #[must_use]
    pub fn notifier(&self) -> &OrderNotifier {
        &self.inner.notifier
    }
}
