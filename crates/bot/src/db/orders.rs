//! Order repository for database operations.
//!
//! Queries use the runtime API with explicit row mapping: the schema is
//! created by our own embedded migrations at startup, so there is no
//! external database to verify against at compile time.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use gamestore_core::{OrderId, OrderStatus, Price, UserId};

use super::RepositoryError;
use crate::models::order::{MostOrdered, NewOrder, Order, OrderStats};

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a confirmed order.
    ///
    /// The store assigns the id (strictly increasing across all inserts)
    /// and the creation timestamp. A single INSERT statement, so concurrent
    /// callers can never observe a partial row or share an id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, order), fields(user_id = %order.user_id, item_key = %order.item_key))]
    pub async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let created_at = Utc::now();
        let status = OrderStatus::Pending;

        let result = sqlx::query(
            r"
            INSERT INTO orders
                (user_id, username, item_key, variant_label, game_id,
                 customer_name, contact, price, created_at, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(order.user_id.as_i64())
        .bind(&order.username)
        .bind(&order.item_key)
        .bind(&order.variant_label)
        .bind(&order.game_id)
        .bind(&order.customer_name)
        .bind(&order.contact)
        .bind(order.price.amount())
        .bind(created_at)
        .bind(status.to_string())
        .execute(self.pool)
        .await?;

        let id = OrderId::new(result.last_insert_rowid());

        Ok(Order {
            id,
            user_id: order.user_id,
            username: order.username,
            item_key: order.item_key,
            variant_label: order.variant_label,
            game_id: order.game_id,
            customer_name: order.customer_name,
            contact: order.contact,
            price: order.price,
            created_at,
            status,
        })
    }

    /// Fetch up to `limit` most recent orders, newest first.
    ///
    /// Ids are assigned in creation order, so id order is creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, username, item_key, variant_label, game_id,
                   customer_name, contact, price, created_at, status
            FROM orders
            ORDER BY id DESC
            LIMIT ?1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(map_order_row).collect()
    }

    /// Aggregate figures over all orders.
    ///
    /// Revenue is 0 when the table is empty; the most-ordered item breaks
    /// count ties in favor of the item that was ordered first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn aggregate(&self) -> Result<OrderStats, RepositoryError> {
        let totals = sqlx::query(
            r"
            SELECT COUNT(*) AS order_count, COALESCE(SUM(price), 0) AS total_revenue
            FROM orders
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let order_count: i64 = totals.try_get("order_count")?;
        let total_revenue: i64 = totals.try_get("total_revenue")?;

        let most_ordered = sqlx::query(
            r"
            SELECT item_key, COUNT(*) AS order_count
            FROM orders
            GROUP BY item_key
            ORDER BY order_count DESC, MIN(id) ASC
            LIMIT 1
            ",
        )
        .fetch_optional(self.pool)
        .await?
        .map(|row| -> Result<MostOrdered, RepositoryError> {
            Ok(MostOrdered {
                item_key: row.try_get("item_key")?,
                order_count: row.try_get("order_count")?,
            })
        })
        .transpose()?;

        Ok(OrderStats {
            order_count,
            total_revenue: Price::new(total_revenue),
            most_ordered,
        })
    }
}

fn map_order_row(row: SqliteRow) -> Result<Order, RepositoryError> {
    let status_text: String = row.try_get("status")?;
    let status = status_text.parse::<OrderStatus>().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
    })?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        username: row.try_get("username")?,
        item_key: row.try_get("item_key")?,
        variant_label: row.try_get("variant_label")?,
        game_id: row.try_get("game_id")?,
        customer_name: row.try_get("customer_name")?,
        contact: row.try_get("contact")?,
        price: Price::new(row.try_get("price")?),
        created_at,
        status,
    })
}
