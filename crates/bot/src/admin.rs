//! Operator-only reporting queries.
//!
//! Access is a single exact-match check against the configured operator id.
//! The check runs before any data is touched: a rejected caller causes no
//! reads at all.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{instrument, warn};

use gamestore_core::UserId;

use crate::db::{OrderRepository, RepositoryError};
use crate::models::order::{Order, OrderStats};

/// How many orders an order report covers.
pub const RECENT_ORDERS_LIMIT: i64 = 10;

/// Errors from admin queries.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The caller is not the configured operator.
    #[error("caller is not the operator")]
    Unauthorized,

    /// Database error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Reporting queries gated on the operator id.
pub struct AdminService<'a> {
    pool: &'a SqlitePool,
    operator: UserId,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, operator: UserId) -> Self {
        Self { pool, operator }
    }

    /// The most recent orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Unauthorized` for any caller but the operator,
    /// and `AdminError::Repository` if the query fails.
    #[instrument(skip(self), fields(caller = %caller))]
    pub async fn recent_orders(&self, caller: UserId) -> Result<Vec<Order>, AdminError> {
        self.authorize(caller)?;
        Ok(OrderRepository::new(self.pool)
            .recent(RECENT_ORDERS_LIMIT)
            .await?)
    }

    /// Aggregate figures over all orders.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Unauthorized` for any caller but the operator,
    /// and `AdminError::Repository` if the query fails.
    #[instrument(skip(self), fields(caller = %caller))]
    pub async fn stats(&self, caller: UserId) -> Result<OrderStats, AdminError> {
        self.authorize(caller)?;
        Ok(OrderRepository::new(self.pool).aggregate().await?)
    }

    fn authorize(&self, caller: UserId) -> Result<(), AdminError> {
        if caller == self.operator {
            Ok(())
        } else {
            warn!(caller = %caller, "Rejected admin query from non-operator");
            Err(AdminError::Unauthorized)
        }
    }
}

impl std::fmt::Debug for AdminService<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService")
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}
